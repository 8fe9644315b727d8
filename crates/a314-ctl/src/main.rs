use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use a314_core::{
    ClientRequest, Command as ReqCommand, Config, EchoPeer, NullRequestSource, OwnerId, ReplyCode,
    Service, SignalSource, Wake, reply_channel, request_channel,
};
use a314_ctl::{Cli, Command, render_status};
use a314_wire::{ComArea, Role};
use clap::Parser;
use tracing::info;

/// Stand-in for the interrupt-driven wake-up this tool has no real ISR to
/// install for: ticks the main loop at a fixed interval instead of waiting
/// on a genuine peer edge.
struct PollSignal {
    interval: Duration,
}

impl SignalSource for PollSignal {
    fn notify(&self, _reason: Wake) {}

    fn wait(&self) -> Wake {
        std::thread::sleep(self.interval);
        Wake::PEER
    }
}

fn main() {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_env_filter(std::env::var("RUST_LOG").unwrap_or_else(|_| "a314=info".into()))
        .init();

    match cli.command {
        Command::Serve { mailbox, grace_iterations, poll_interval_ms } => {
            serve(cli.app_name.as_deref(), mailbox, grace_iterations, poll_interval_ms);
        }
        Command::Status { mailbox } => status(cli.app_name.as_deref(), mailbox, cli.json),
        Command::Demo { service } => demo(&service),
    }
}

fn build_config(app_name: Option<&str>, mailbox: String) -> Config {
    let config = Config::new(mailbox);
    match app_name {
        Some(app_name) => config.with_app_name(app_name),
        None => config,
    }
}

/// `serve`: attaches (creating if necessary) to a mailbox as the local side
/// and runs the protocol engine until Ctrl-C, with no client-request
/// transport wired up (`NullRequestSource` — that transport is external to
/// this tool).
fn serve(
    app_name: Option<&str>,
    mailbox: String,
    grace_iterations: Option<u64>,
    poll_interval_ms: u64,
) {
    let mut config = build_config(app_name, mailbox);
    if let Some(grace) = grace_iterations {
        config = config.with_stream_id_grace_iterations(grace);
    }

    let path = config.shmem_path();
    let comarea = ComArea::create_or_open(&path, Role::Local)
        .unwrap_or_else(|e| panic!("couldn't attach to mailbox at {}: {e}", path.display()));

    info!(mailbox = config.mailbox_name(), path = %path.display(), "mailbox attached, serving");

    let running = Arc::new(AtomicBool::new(true));
    {
        let running = Arc::clone(&running);
        ctrlc::set_handler(move || running.store(false, Ordering::SeqCst))
            .expect("failed installing Ctrl-C handler");
    }

    let signal = PollSignal { interval: Duration::from_millis(poll_interval_ms) };
    let mut service = Service::new(config, comarea, NullRequestSource);
    while running.load(Ordering::SeqCst) {
        let woken = signal.wait();
        service.run_iteration(woken);
    }
    info!("shutdown requested, exiting");
}

/// `status`: attaches read-only and prints the two rings' occupancy. The
/// socket table itself lives in the serving process's memory, not the
/// shared `ComArea`, so ring occupancy is all an out-of-process tool can
/// observe without instrumenting the service.
fn status(app_name: Option<&str>, mailbox: String, json: bool) {
    let config = build_config(app_name, mailbox.clone());
    let path = config.shmem_path();
    let comarea = ComArea::create_or_open(&path, Role::Remote)
        .unwrap_or_else(|e| panic!("couldn't attach to mailbox at {}: {e}", path.display()));
    println!("{}", render_status(&mailbox, comarea.snapshot(), json));
}

/// `demo`: drives a full connect/write/read/eos exchange against an
/// in-process [`EchoPeer`] over a loopback `ComArea` pair, with no shared
/// memory or second process involved.
fn demo(service_name: &str) {
    let (local, remote) = ComArea::loopback_pair();
    let mut peer = EchoPeer::new(remote, [service_name.as_bytes().to_vec()]);
    let (tx, requests) = request_channel();
    let mut service = Service::new(Config::new("demo"), local, requests);

    let owner = OwnerId(0);
    let connect =
        submit(&tx, owner, ReqCommand::Connect { service: service_name.as_bytes().to_vec() });
    service.run_iteration(Wake::REQUEST);
    peer.service();
    service.run_iteration(Wake::PEER);
    println!("connect: {:?}", connect.recv().unwrap());

    let write =
        submit(&tx, owner, ReqCommand::Write { payload: b"hello from a314-ctl demo".to_vec() });
    service.run_iteration(Wake::REQUEST);
    println!("write: {:?}", write.recv().unwrap());
    peer.service();

    let read = submit(&tx, owner, ReqCommand::Read { capacity: 64 });
    service.run_iteration(Wake::REQUEST);
    service.run_iteration(Wake::PEER);
    match read.recv().unwrap() {
        ReplyCode::ReadOk(payload) => {
            println!("read: {:?}", String::from_utf8_lossy(&payload));
        }
        other => println!("read: {other:?}"),
    }

    let eos = submit(&tx, owner, ReqCommand::Eos);
    service.run_iteration(Wake::REQUEST);
    println!("eos: {:?}", eos.recv().unwrap());
    peer.service();
    service.run_iteration(Wake::PEER);

    let read_eos = submit(&tx, owner, ReqCommand::Read { capacity: 64 });
    service.run_iteration(Wake::REQUEST);
    println!("read after eos: {:?}", read_eos.recv().unwrap());
}

fn submit(
    tx: &std::sync::mpsc::Sender<ClientRequest>,
    owner: OwnerId,
    command: ReqCommand,
) -> std::sync::mpsc::Receiver<ReplyCode> {
    let (reply, rx) = reply_channel();
    tx.send(ClientRequest { owner, local_id: 0, command, reply }).expect("service loop is alive");
    rx
}
