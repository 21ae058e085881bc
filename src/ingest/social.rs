//! Captured social-media posts.
//!
//! Posts have no headline, so the title is synthesized from the author and
//! flagged as such; the resolver compares these posts on content alone. The
//! post text (or the OCR text of a screenshot capture) becomes the content.

use crate::models::{Engagement, EngagementMetrics, RawRecord, SourceType};
use serde::{Deserialize, Serialize};
use url::Url;

/// A post as exported by the capture tool.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SocialPost {
    pub id: Option<String>,
    pub platform: Option<String>,
    pub platform_post_id: Option<String>,
    pub author_username: Option<String>,
    pub author_name: Option<String>,
    pub text: Option<String>,
    /// Text recovered from a screenshot when the post body was not captured.
    pub extracted_text: Option<String>,
    pub posted_date: Option<String>,
    pub captured_date: Option<String>,
    pub engagement_metrics: Option<EngagementMetrics>,
    pub category: Option<String>,
}

impl SocialPost {
    pub fn into_record(self) -> RawRecord {
        let username = self
            .author_username
            .clone()
            .filter(|u| !u.trim().is_empty());
        let platform = self
            .platform
            .as_deref()
            .filter(|p| !p.trim().is_empty())
            .unwrap_or("social")
            .to_uppercase();

        let mut record = RawRecord::new(
            SourceType::Social,
            format!("{platform}/{}", username.as_deref().unwrap_or("unknown")),
        );
        record.id = self.id;
        record.title = Some(format!(
            "Post by {}",
            username.as_deref().unwrap_or("Unknown")
        ));
        record.title_synthesized = true;
        record.content = self
            .text
            .filter(|t| !t.trim().is_empty())
            .or(self.extracted_text);
        // Only a permalink locates the post; bare platform ids do not.
        record.url = self
            .platform_post_id
            .filter(|id| Url::parse(id.trim()).is_ok_and(|u| u.has_host()));
        record.author = self.author_name.or(username);
        record.published_at = self.posted_date.or(self.captured_date);
        record.engagement = self.engagement_metrics.map(Engagement::Metrics);
        record.source_category = self.category;
        record
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_post_becomes_social_record() {
        let post: SocialPost = serde_json::from_str(
            r#"{
                "id": "x-991",
                "platform": "twitter",
                "author_username": "zimlive",
                "text": "Fuel queues are back in Harare",
                "posted_date": "2025-05-06T09:00:00Z",
                "engagement_metrics": {"likes": 120, "retweets": 30, "comments": 4}
            }"#,
        )
        .unwrap();

        let record = post.into_record();
        assert_eq!(record.source_type, SourceType::Social);
        assert_eq!(record.source_name, "TWITTER/zimlive");
        assert_eq!(record.title.as_deref(), Some("Post by zimlive"));
        assert!(record.title_synthesized);
        assert_eq!(record.author.as_deref(), Some("zimlive"));
        assert_eq!(record.engagement.unwrap().total(), 154.0);
    }

    #[test]
    fn test_falls_back_to_extracted_text_and_capture_date() {
        let post = SocialPost {
            extracted_text: Some("OCR text".to_string()),
            text: Some("  ".to_string()),
            captured_date: Some("2025-05-06".to_string()),
            ..SocialPost::default()
        };
        let record = post.into_record();
        assert_eq!(record.content.as_deref(), Some("OCR text"));
        assert_eq!(record.published_at.as_deref(), Some("2025-05-06"));
        assert_eq!(record.title.as_deref(), Some("Post by Unknown"));
        assert_eq!(record.source_name, "SOCIAL/unknown");
        assert!(record.engagement.is_none());
    }

    #[test]
    fn test_only_permalinks_become_urls() {
        let bare = SocialPost {
            platform_post_id: Some("1789203344".to_string()),
            ..SocialPost::default()
        };
        assert!(bare.into_record().url.is_none());

        let link = "https://x.com/zimlive/status/1789203344";
        let permalink = SocialPost {
            platform_post_id: Some(link.to_string()),
            ..SocialPost::default()
        };
        assert_eq!(permalink.into_record().url.as_deref(), Some(link));
    }
}
