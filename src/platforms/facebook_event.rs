//! Facebook 活动（单个活动 / 活动发现页）

use async_trait::async_trait;

use crate::error::AppResult;
use crate::models::PlatformId;
use crate::platforms::facebook::{facebook_login_spec, LOGIN_DIALOG, MAIN_MARKER};
use crate::platforms::Platform;
use crate::services::{FieldSpec, LinkPattern, LoginSpec, Readiness};

pub const DISCOVERY_URL: &str = "https://www.facebook.com/events/discovery/";

const ORGANIZER_SCRIPT: &str = r#"(() => {
    for (const span of document.querySelectorAll("span[dir='auto']")) {
        if (!(span.innerText || '').trim().startsWith('Event by')) continue;
        const a = span.querySelector('a');
        return a ? { name: a.innerText.trim(), url: a.getAttribute('href') } : null;
    }
    return null;
})()"#;

/// Facebook 活动
pub struct FacebookEvent;

#[async_trait]
impl Platform for FacebookEvent {
    fn id(&self) -> PlatformId {
        PlatformId::FacebookEvent
    }

    fn login_spec(&self) -> AppResult<LoginSpec> {
        facebook_login_spec(self.id())
    }

    fn readiness(&self) -> Readiness<'static> {
        Readiness {
            marker: MAIN_MARKER,
            dismiss: Some(LOGIN_DIALOG),
        }
    }

    fn fields(&self) -> AppResult<Vec<FieldSpec>> {
        Ok(vec![
            FieldSpec::new("event_name")
                .text("h1 span.html-span")
                .stripped_html("h1", Some("events")),
            FieldSpec::new("event_datetime").pattern(
                "span[dir='auto']",
                &[
                    // Thursday, September 4, 2025 at 9:30 AM PST
                    r"^[A-Za-z]+, [A-Za-z]+ \d{1,2}, \d{4} at .+",
                    // May 24 at 11 PM – May 26 at 5 AM PST
                    r"^[A-Za-z]+ \d{1,2} at .+ – [A-Za-z]+ \d{1,2} at .+",
                ],
            )?,
            FieldSpec::new("responses_count").pattern(
                "span[dir='auto']",
                &[r"([\d.,]+[KMkm]?) people responded"],
            )?,
            FieldSpec::new("organizer_name").script(format!("({})?.name ?? null", ORGANIZER_SCRIPT)),
            FieldSpec::new("organizer_url").script(format!("({})?.url ?? null", ORGANIZER_SCRIPT)),
            FieldSpec::new("venue_name")
                .text("div[role='listitem'] span[dir='auto'] div[role='button']"),
            FieldSpec::new("tickets_url")
                .attr("a[aria-label='Find tickets for this event']", "href"),
            FieldSpec::new("tickets_info").text("a[aria-label='Find tickets for this event']"),
        ])
    }

    fn supports_discovery(&self) -> bool {
        true
    }

    fn default_listing(&self) -> Option<&'static str> {
        Some(DISCOVERY_URL)
    }

    fn link_pattern(&self) -> AppResult<LinkPattern> {
        LinkPattern::new("a[href*='/events/']", r"/events/\d{5,20}(?:/|\?|$)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leaf_pattern_skips_category_pages() {
        let pattern = FacebookEvent.link_pattern().unwrap();
        assert!(pattern.leaf.is_match("https://www.facebook.com/events/1234567890/"));
        assert!(pattern.leaf.is_match("https://www.facebook.com/events/1234567890?ref=x"));
        assert!(!pattern.leaf.is_match("https://www.facebook.com/events/discovery/"));
        assert!(!pattern.leaf.is_match("https://www.facebook.com/events/calendar"));
    }

    #[test]
    fn declares_all_event_fields_in_order() {
        let names: Vec<String> = FacebookEvent
            .fields()
            .unwrap()
            .into_iter()
            .map(|f| f.name)
            .collect();
        assert_eq!(
            names,
            [
                "event_name",
                "event_datetime",
                "responses_count",
                "organizer_name",
                "organizer_url",
                "venue_name",
                "tickets_url",
                "tickets_info"
            ]
        );
    }
}
