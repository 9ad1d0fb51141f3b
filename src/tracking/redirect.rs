use crate::tracking::dom::TrackableElement;

/// What is known about a dispatch when deciding whether the click must be followed by a
/// programmatic navigation.
#[derive(Clone, Copy, Debug, Default)]
pub struct RedirectContext<'a> {
    /// The link's `href`, `None` when absent or empty.
    pub callback_url: Option<&'a str>,
    /// The link's `target`, `Some` whenever the attribute is present.
    pub target_attribute: Option<&'a str>,
    /// Source element of the click, `None` for imperative calls.
    pub element: Option<&'a dyn TrackableElement>,
}

/// Returns true when the default navigation was suppressed and the event's completion callback
/// has to perform it instead.
///
/// That is the case for a non-empty callback URL other than `"#"`, no target attribute, and an
/// element (if any) that does not carry `ignore_redirect_attribute`.
pub fn need_redirect_after_event(context: &RedirectContext<'_>, ignore_redirect_attribute: &str) -> bool {
    let Some(url) = context.callback_url else {
        return false;
    };
    if url.is_empty() || url == "#" || context.target_attribute.is_some() {
        return false;
    }
    !context
        .element
        .is_some_and(|element| element.has_attribute(ignore_redirect_attribute))
}
