//! Message-log slicing and input validation.
//!
//! Messages live embedded in their conversation document in append order,
//! so pagination is a window over the in-memory sequence: page 1 is the
//! newest `limit` messages, higher pages walk toward the oldest, and each
//! returned page is in chronological (oldest-first) order.

use serde::Serialize;

use super::{ChatError, ChatResult};

pub const MAX_CONTENT_LEN: usize = 1000;
pub const DEFAULT_PAGE_LIMIT: u64 = 50;

/// A window of a conversation's message log.
#[derive(Debug, Clone, Serialize)]
pub struct MessagePage<M> {
    pub items: Vec<M>,
    pub total: usize,
    pub page: u64,
    pub limit: u64,
    /// Older messages exist beyond this page.
    pub has_next: bool,
    /// A newer page exists before this one.
    pub has_prev: bool,
}

/// Rejects messages that carry neither text content nor a file reference,
/// and over-long content.
pub fn validate_message(content: &str, file_url: Option<&str>) -> ChatResult<()> {
    let has_content = !content.trim().is_empty();
    let has_file = file_url.is_some_and(|url| !url.is_empty());

    if !has_content && !has_file {
        return Err(ChatError::Validation(
            "Message content or file URL is required".to_string(),
        ));
    }
    if content.len() > MAX_CONTENT_LEN {
        return Err(ChatError::Validation(format!(
            "Message cannot be more than {MAX_CONTENT_LEN} characters"
        )));
    }
    Ok(())
}

/// Slices the `limit` messages ending `page - 1` pages back from the end of
/// the log, oldest-first within the page.
pub fn paginate<M: Clone>(messages: &[M], page: u64, limit: u64) -> MessagePage<M> {
    let page = page.max(1);
    let limit = limit.max(1);
    let total = messages.len();

    // Saturating arithmetic: page and limit arrive unchecked from query
    // params, and an out-of-range page must degrade to an empty window.
    let start_index = (page - 1).saturating_mul(limit) as usize;
    let end = total.saturating_sub(start_index);
    let start = end.saturating_sub(limit as usize);

    MessagePage {
        items: messages[start..end].to_vec(),
        total,
        page,
        limit,
        has_next: start_index.saturating_add(limit as usize) < total,
        has_prev: start_index > 0,
    }
}
