mod builder;
mod parser;
pub mod transition;

pub use builder::NewTicket;
pub use parser::{parse_summary, summary_from_document};
pub use transition::ParentState;

use jiff::Timestamp;

/// Truncate to whole seconds, the precision timestamps are stored with.
pub(crate) fn whole_seconds(at: Timestamp) -> Timestamp {
    Timestamp::from_second(at.as_second()).unwrap_or(at)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_whole_seconds() {
        let at: Timestamp = "2026-01-04T10:00:00.750Z".parse().unwrap();
        assert_eq!(whole_seconds(at).to_string(), "2026-01-04T10:00:00Z");
        assert_eq!(whole_seconds(Timestamp::MAX).as_second(), Timestamp::MAX.as_second());
        assert_eq!(whole_seconds(Timestamp::MIN), Timestamp::MIN);
    }
}
