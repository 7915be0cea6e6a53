//! Browser-facing seams.
//!
//! Everything the controller needs from the browser goes through these
//! traits: tab enumeration and messaging ([`TabHost`]), the DOM of a host
//! page ([`PageDocument`]) and the popup's channel to the background
//! ([`RuntimeChannel`]).

use async_trait::async_trait;

use crate::types::command::{PageRequest, PageResponse};
use crate::types::errors::{ChannelError, TabError};
use crate::types::message::{RuntimeMessage, RuntimeResponse};
use crate::types::page::{ElementHandle, MediaSnapshot, MediaUpdate};
use crate::types::tab::{BrowserTab, TabId, TabQuery};

/// Tab enumeration, cross-context messaging and script injection.
#[async_trait]
pub trait TabHost: Send + Sync {
    /// Look up a single tab. `TabError::NotFound` once the tab is closed.
    async fn get(&self, tab_id: TabId) -> Result<BrowserTab, TabError>;

    /// Enumerate tabs in browser listing order.
    async fn query(&self, query: &TabQuery) -> Result<Vec<BrowserTab>, TabError>;

    /// One request/response round-trip with the content script of a tab.
    async fn send_message(
        &self,
        tab_id: TabId,
        request: &PageRequest,
    ) -> Result<PageResponse, ChannelError>;

    /// Inject the content script into a tab. Injecting twice is harmless.
    async fn inject_content_script(&self, tab_id: TabId) -> Result<(), ChannelError>;
}

/// The live DOM of a YouTube page, as seen by the content script.
///
/// Lookups are soft: a missing element is `None`/`false`, never an error.
pub trait PageDocument: Send {
    /// Current `location.href`.
    fn location(&self) -> String;

    /// First element matching any selector of a comma-separated list.
    fn query_selector(&self, selector: &str) -> Option<ElementHandle>;

    /// Whether the element is still attached to the document.
    fn is_connected(&self, element: ElementHandle) -> bool;

    fn attribute(&self, element: ElementHandle, name: &str) -> Option<String>;

    fn is_disabled(&self, element: ElementHandle) -> bool;

    fn text_content(&self, element: ElementHandle) -> Option<String>;

    /// Dispatch a click. Returns false if the element is gone.
    fn click(&mut self, element: ElementHandle) -> bool;

    /// The page's `<video>` element, if present.
    fn media(&self) -> Option<MediaSnapshot>;

    /// Write one property of the media element. Returns false if there is none.
    fn update_media(&mut self, update: MediaUpdate) -> bool;

    /// `history.back()`.
    fn history_back(&mut self) -> bool;
}

/// The popup's request/response channel to the background coordinator.
#[async_trait]
pub trait RuntimeChannel: Send + Sync {
    async fn send(&self, message: RuntimeMessage) -> Result<RuntimeResponse, ChannelError>;
}
