//! Print cached events.

use anyhow::Result;
use sync_types::Event;

use crate::config::{self, Paths};
use sync_store::EventStore;

/// Caller-side view filter.
#[derive(Debug, Clone, Default)]
pub struct ListFilter {
    /// Only this author.
    pub author: Option<String>,
    /// Only this kind.
    pub kind: Option<u32>,
    /// At most this many rows.
    pub limit: Option<usize>,
}

impl ListFilter {
    fn matches(&self, event: &Event) -> bool {
        self.author.as_ref().map_or(true, |a| *a == event.author)
            && self.kind.map_or(true, |k| k == event.kind)
    }
}

/// Run the list command.
pub async fn run(paths: &Paths, filter: &ListFilter) -> Result<()> {
    let config = config::load(paths)?;
    let store = config::open_store(paths, &config).await?;
    let events = store.get_all().await?;

    let selected = select(events, filter);
    if selected.is_empty() {
        println!("No cached events.");
        return Ok(());
    }
    for event in &selected {
        println!("{}", format_event(event));
    }
    Ok(())
}

/// Apply the view filter to events already in replica order.
fn select(events: Vec<Event>, filter: &ListFilter) -> Vec<Event> {
    events
        .into_iter()
        .filter(|e| filter.matches(e))
        .take(filter.limit.unwrap_or(usize::MAX))
        .collect()
}

fn format_event(event: &Event) -> String {
    let preview: String = event.content.chars().take(48).collect();
    let ellipsis = if event.content.chars().count() > 48 {
        "..."
    } else {
        ""
    };
    format!(
        "{}  {}  kind={:<5}  {}  {}{}",
        event.created_at,
        short(&event.id),
        event.kind,
        short(&event.author),
        preview.replace('\n', " "),
        ellipsis
    )
}

fn short(hex: &str) -> &str {
    hex.get(..12).unwrap_or(hex)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALICE: &str = "d4ed245d98f8867bba709f820e83f65884791076d189e92be0c595f78daf1ccd";
    const BOB: &str = "c1a9ea801212d71b39146d2d867f8744000cab935d062dce6756eac8ad408c72";

    fn events() -> Vec<Event> {
        vec![
            Event::new(ALICE, 30, 4, vec![], "c"),
            Event::new(BOB, 20, 4, vec![], "b"),
            Event::new(ALICE, 10, 30078, vec![], "a"),
        ]
    }

    #[test]
    fn select_by_author_and_kind() {
        let filter = ListFilter {
            author: Some(ALICE.to_string()),
            ..Default::default()
        };
        assert_eq!(select(events(), &filter).len(), 2);

        let filter = ListFilter {
            author: Some(ALICE.to_string()),
            kind: Some(4),
            limit: None,
        };
        let selected = select(events(), &filter);
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].content, "c");
    }

    #[test]
    fn limit_keeps_newest() {
        let filter = ListFilter {
            limit: Some(2),
            ..Default::default()
        };
        let selected = select(events(), &filter);
        assert_eq!(
            selected.iter().map(|e| e.created_at).collect::<Vec<_>>(),
            vec![30, 20]
        );
    }

    #[test]
    fn format_truncates_long_content() {
        let event = Event::new(ALICE, 1, 4, vec![], "x".repeat(100));
        let line = format_event(&event);
        assert!(line.ends_with("..."));
        assert!(line.contains(&ALICE[..12]));
        assert!(!line.contains(ALICE));
    }

    #[tokio::test]
    async fn list_on_fresh_replica() {
        let dir = tempfile::tempdir().unwrap();
        let paths = Paths::new(dir.path(), None);
        crate::commands::init::run(&paths, false).await.unwrap();

        run(&paths, &ListFilter::default()).await.unwrap();
    }
}
