use serde_json::{Value, json};

use crate::{error::NoteError, notes::prompt::ChatMessage, provider::Provider};

pub(crate) const TEMPERATURE: f64 = 0.7;
const QWEN_TOP_P: f64 = 0.8;

pub fn request_body(
    provider: Provider,
    model: &str,
    messages: &[ChatMessage],
    max_tokens: u32,
) -> Value {
    match provider {
        Provider::Qwen => json!({
            "model": model,
            "input": {
                "messages": messages,
            },
            "parameters": {
                "result_format": "message",
                "max_tokens": max_tokens,
                "temperature": TEMPERATURE,
                "top_p": QWEN_TOP_P,
            },
        }),
        Provider::Kimi => json!({
            "model": model,
            "messages": messages,
            "temperature": TEMPERATURE,
            "max_tokens": max_tokens,
        }),
    }
}

/// Pull the generated text out of a successful response.
pub fn parse_reply(provider: Provider, response: &Value) -> Result<String, NoteError> {
    let choices = match provider {
        Provider::Qwen => &response["output"]["choices"],
        Provider::Kimi => &response["choices"],
    };

    choices[0]["message"]["content"]
        .as_str()
        .filter(|content| !content.trim().is_empty())
        .map(str::to_string)
        .ok_or_else(|| {
            let preview: String = response.to_string().chars().take(200).collect();
            NoteError::InvalidResponse {
                provider_name: provider.name().to_string(),
                reason: format!("no message content in {preview}"),
            }
        })
}

/// Error text of a failed response: `error.message`, then `message`.
pub fn error_message(body: &Value) -> Option<String> {
    body["error"]["message"]
        .as_str()
        .or_else(|| body["message"].as_str())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn messages() -> Vec<ChatMessage> {
        vec![ChatMessage::system("sys"), ChatMessage::user("prompt")]
    }

    #[test]
    fn qwen_body_nests_messages_under_input() {
        let body = request_body(Provider::Qwen, "qwen-plus", &messages(), 8000);

        assert_eq!(body["model"], "qwen-plus");
        assert_eq!(body["input"]["messages"][0]["role"], "system");
        assert_eq!(body["input"]["messages"][1]["content"], "prompt");
        assert_eq!(body["parameters"]["result_format"], "message");
        assert_eq!(body["parameters"]["max_tokens"], 8000);
        assert_eq!(body["parameters"]["top_p"], 0.8);
        assert!(body.get("messages").is_none());
    }

    #[test]
    fn kimi_body_is_openai_style() {
        let body = request_body(Provider::Kimi, "kimi-k2-0905-preview", &messages(), 4000);

        assert_eq!(body["messages"][1]["role"], "user");
        assert_eq!(body["temperature"], 0.7);
        assert_eq!(body["max_tokens"], 4000);
        assert!(body.get("input").is_none());
    }

    #[test]
    fn replies_are_read_from_provider_specific_paths() {
        let qwen = json!({ "output": { "choices": [ { "message": { "content": "# 笔记" } } ] } });
        let kimi = json!({ "choices": [ { "message": { "content": "# Notes" } } ] });

        assert_eq!(parse_reply(Provider::Qwen, &qwen).unwrap(), "# 笔记");
        assert_eq!(parse_reply(Provider::Kimi, &kimi).unwrap(), "# Notes");
        assert!(matches!(
            parse_reply(Provider::Qwen, &kimi),
            Err(NoteError::InvalidResponse { .. })
        ));
    }

    #[test]
    fn error_message_prefers_nested_error() {
        let nested = json!({ "error": { "message": "invalid key" }, "message": "outer" });
        let flat = json!({ "code": "InvalidApiKey", "message": "bad key" });

        assert_eq!(error_message(&nested).as_deref(), Some("invalid key"));
        assert_eq!(error_message(&flat).as_deref(), Some("bad key"));
        assert_eq!(error_message(&json!({})), None);
    }
}
