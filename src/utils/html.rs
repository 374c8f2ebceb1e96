/// Sanitizes user-visible text with ammonia's whitelist.
///
/// Safe inline tags survive; `<script>` (with its content), `<iframe>` and
/// event-handler attributes are stripped.
pub fn clean_html(input: &str) -> String {
    ammonia::clean(input)
}
