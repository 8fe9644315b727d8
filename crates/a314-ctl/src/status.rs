use a314_wire::ComAreaSnapshot;

/// Renders a [`ComAreaSnapshot`] as either a human-readable line or JSON:
/// the entire job of the `status` subcommand.
pub fn render_status(mailbox: &str, snapshot: ComAreaSnapshot, json: bool) -> String {
    if json {
        serde_json::json!({
            "mailbox": mailbox,
            "a2r_used": snapshot.a2r_used,
            "r2a_used": snapshot.r2a_used,
        })
        .to_string()
    } else {
        format!(
            "mailbox {mailbox}: a2r used {:>3}/255  r2a used {:>3}/255",
            snapshot.a2r_used, snapshot.r2a_used
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_output_is_well_formed() {
        let snapshot = ComAreaSnapshot { a2r_used: 10, r2a_used: 0 };
        let rendered = render_status("demo", snapshot, true);
        let parsed: serde_json::Value = serde_json::from_str(&rendered).unwrap();
        assert_eq!(parsed["a2r_used"], 10);
        assert_eq!(parsed["mailbox"], "demo");
    }

    #[test]
    fn table_output_names_the_mailbox() {
        let snapshot = ComAreaSnapshot { a2r_used: 1, r2a_used: 2 };
        let rendered = render_status("demo", snapshot, false);
        assert!(rendered.contains("demo"));
        assert!(rendered.contains('1'));
        assert!(rendered.contains('2'));
    }
}
