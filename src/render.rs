use chrono::{DateTime, Utc};
use reqwest::Url;
use std::fmt::Write;

use crate::models::Story;
use crate::session::SessionSnapshot;

// Host without the leading "www.", like the domain shown next to HN titles
pub fn domain(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let host = parsed.host_str()?;
    Some(host.strip_prefix("www.").unwrap_or(host).to_string())
}

pub fn time_ago(created_at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let elapsed = now.signed_duration_since(created_at);

    let (amount, unit) = if elapsed.num_days() > 0 {
        (elapsed.num_days(), "day")
    } else if elapsed.num_hours() > 0 {
        (elapsed.num_hours(), "hour")
    } else if elapsed.num_minutes() > 0 {
        (elapsed.num_minutes(), "minute")
    } else {
        return "just now".to_string();
    };

    if amount == 1 {
        format!("1 {} ago", unit)
    } else {
        format!("{} {}s ago", amount, unit)
    }
}

fn render_story(out: &mut String, position: usize, story: &Story, now: DateTime<Utc>) {
    let _ = write!(out, "{:>3}. {}", position, story.title);
    if let Some(domain) = domain(&story.url) {
        let _ = write!(out, " ({})", domain);
    }
    out.push('\n');

    let _ = write!(
        out,
        "     by {} | {} comments | {} points",
        story.author, story.num_comments, story.points
    );
    if let Some(created_at) = story.created_at {
        let _ = write!(out, " | {}", time_ago(created_at, now));
    }
    out.push('\n');
}

/// Renders a snapshot as plain text, numbering stories from 1.
pub fn render_snapshot(snapshot: &SessionSnapshot, now: DateTime<Utc>) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Search: {}", snapshot.search_term);

    if snapshot.is_error {
        out.push_str("Something went wrong ...\n");
    }

    if snapshot.is_loading {
        out.push_str("Loading ...\n");
        return out;
    }

    if snapshot.data.is_empty() {
        out.push_str("No stories.\n");
        return out;
    }

    for (i, story) in snapshot.data.iter().enumerate() {
        render_story(&mut out, i + 1, story, now);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    fn snapshot(data: Vec<Story>) -> SessionSnapshot {
        SessionSnapshot {
            data,
            is_loading: false,
            is_error: false,
            search_term: "React".to_string(),
        }
    }

    #[test]
    fn extracts_domain() {
        assert_eq!(domain("https://www.reactjs.org/docs").as_deref(), Some("reactjs.org"));
        assert_eq!(domain("https://redux.js.org/").as_deref(), Some("redux.js.org"));
        assert_eq!(domain(""), None);
    }

    #[test]
    fn formats_age() {
        assert_eq!(time_ago(now() - Duration::seconds(20), now()), "just now");
        assert_eq!(time_ago(now() - Duration::minutes(1), now()), "1 minute ago");
        assert_eq!(time_ago(now() - Duration::hours(5), now()), "5 hours ago");
        assert_eq!(time_ago(now() - Duration::days(3), now()), "3 days ago");
    }

    #[test]
    fn renders_rows() {
        let story = Story {
            url: "https://reactjs.org/".to_string(),
            author: "Jordan Walke".to_string(),
            num_comments: 3,
            points: 4,
            created_at: Some(now() - Duration::hours(2)),
            ..Story::new(0u64, "React")
        };

        let text = render_snapshot(&snapshot(vec![story]), now());
        assert_eq!(
            text,
            "Search: React\n  1. React (reactjs.org)\n     by Jordan Walke | 3 comments | 4 points | 2 hours ago\n"
        );
    }

    #[test]
    fn loading_hides_rows() {
        let mut snap = snapshot(vec![Story::new(0u64, "React")]);
        snap.is_loading = true;

        let text = render_snapshot(&snap, now());
        assert!(text.contains("Loading ..."));
        assert!(!text.contains("1. React"));
    }

    #[test]
    fn error_keeps_stale_rows() {
        let mut snap = snapshot(vec![Story::new(0u64, "React")]);
        snap.is_error = true;

        let text = render_snapshot(&snap, now());
        assert!(text.contains("Something went wrong ..."));
        assert!(text.contains("1. React"));
    }
}
