/// Discord rejects messages above 2000 characters; stay under with margin.
const MESSAGE_LIMIT: usize = 1900;

/// Split `payload` into sendable pieces of at most [`MESSAGE_LIMIT`] bytes,
/// preferring newline and space boundaries over mid-word cuts.
pub fn split_payload(payload: &str) -> Vec<String> {
    let mut pieces = Vec::new();
    let mut rest = payload;

    while rest.len() > MESSAGE_LIMIT {
        let window = &rest[..MESSAGE_LIMIT];
        let cut = window
            .rfind('\n')
            .or_else(|| window.rfind(' '))
            .unwrap_or(MESSAGE_LIMIT);
        pieces.push(rest[..cut].to_string());
        rest = rest[cut..].trim_start();
    }

    if !rest.is_empty() {
        pieces.push(rest.to_string());
    }

    pieces
}

/// Send `payload` to `channel_id`, chunked to fit Discord's message limit.
pub async fn send_chunked(
    http: &serenity::http::Http,
    channel_id: serenity::model::id::ChannelId,
    payload: &str,
) -> Result<(), serenity::Error> {
    for piece in split_payload(payload) {
        channel_id.say(http, &piece).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_payload_is_untouched() {
        assert_eq!(split_payload("daily standup in 5"), vec!["daily standup in 5"]);
    }

    #[test]
    fn long_payload_splits_on_line_boundaries() {
        let line = "x".repeat(1200);
        let payload = format!("{line}\n{line}");
        let pieces = split_payload(&payload);
        assert_eq!(pieces.len(), 2);
        assert_eq!(pieces[0], line);
        assert_eq!(pieces[1], line);
    }

    #[test]
    fn unbroken_text_is_hard_cut_under_the_limit() {
        let pieces = split_payload(&"y".repeat(4000));
        assert!(pieces.len() >= 3);
        assert!(pieces.iter().all(|p| p.len() <= MESSAGE_LIMIT));
        assert_eq!(pieces.iter().map(String::len).sum::<usize>(), 4000);
    }

    #[test]
    fn empty_payload_produces_nothing() {
        assert!(split_payload("").is_empty());
    }
}
