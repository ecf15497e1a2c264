use serde::Serialize;

pub const PAGE_VIEW_EVENT: &str = "page_view";

const DEFAULT_LANGUAGE: &str = "en-US";
const ENGAGEMENT_TIME_MSEC: &str = "100";
const SCREEN_RESOLUTION: &str = "1920x1080";
const DOCUMENT_ENCODING: &str = "UTF-8";

/// A single page view captured from an eligible proxied request.
///
/// Request-scoped: constructed once, serialized once, then discarded.
#[derive(Debug, Clone)]
pub struct PageView {
    pub client_id: String,
    pub page_location: String,
    pub page_referrer: String,
    pub user_agent: Option<String>,
    pub language: String,
}

impl PageView {
    pub fn new(
        client_id: String,
        page_location: String,
        referrer: Option<&str>,
        user_agent: Option<&str>,
        accept_language: Option<&str>,
    ) -> Self {
        Self {
            client_id,
            page_location,
            page_referrer: referrer.unwrap_or_default().to_string(),
            user_agent: user_agent.map(str::to_string),
            language: first_language(accept_language),
        }
    }

    /// Wire representation for the Measurement Protocol.
    pub fn to_payload(&self) -> CollectPayload {
        CollectPayload {
            client_id: self.client_id.clone(),
            events: vec![CollectEvent {
                name: PAGE_VIEW_EVENT.to_string(),
                params: PageViewParams {
                    page_location: self.page_location.clone(),
                    page_referrer: self.page_referrer.clone(),
                    page_title: String::new(),
                    user_agent: self.user_agent.clone(),
                    engagement_time_msec: ENGAGEMENT_TIME_MSEC.to_string(),
                    language: self.language.clone(),
                    screen_resolution: SCREEN_RESOLUTION.to_string(),
                    document_encoding: DOCUMENT_ENCODING.to_string(),
                    document_charset: DOCUMENT_ENCODING.to_string(),
                },
            }],
        }
    }
}

/// Request body for `/mp/collect`.
#[derive(Debug, Clone, Serialize)]
pub struct CollectPayload {
    pub client_id: String,
    pub events: Vec<CollectEvent>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CollectEvent {
    pub name: String,
    pub params: PageViewParams,
}

/// Parameters of one `page_view` event. The user agent is omitted from the
/// serialized object when the request carried none.
#[derive(Debug, Clone, Serialize)]
pub struct PageViewParams {
    pub page_location: String,
    pub page_referrer: String,
    pub page_title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    pub engagement_time_msec: String,
    pub language: String,
    pub screen_resolution: String,
    pub document_encoding: String,
    pub document_charset: String,
}

/// First entry of an accept-language header, or the default when the header
/// is absent or empty.
fn first_language(accept_language: Option<&str>) -> String {
    accept_language
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| DEFAULT_LANGUAGE.to_string())
}
