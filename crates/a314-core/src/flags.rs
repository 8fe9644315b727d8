use bitflags::bitflags;

bitflags! {
    /// The six independent per-socket flag bits.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct SocketFlags: u8 {
        const CLOSED              = 0b0000_0001;
        const RCVD_EOS_FROM_PEER   = 0b0000_0010;
        const SENT_EOS_TO_PEER     = 0b0000_0100;
        const SENT_EOS_TO_CLIENT   = 0b0000_1000;
        const RCVD_EOS_FROM_CLIENT = 0b0001_0000;
        const SHOULD_SEND_RESET    = 0b0010_0000;
    }
}
