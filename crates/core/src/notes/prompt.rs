use serde::Serialize;

pub const DEFAULT_PROMPT_TEMPLATE: &str = "你是一个专业的学习笔记生成助手。请根据以下视频字幕内容，生成一份结构化的Markdown学习笔记。

要求：
1. 在开头生成一段150字左右的核心内容摘要（Summary）
2. 分析全文，划分出合乎逻辑的段落和主题，生成带有多级标题的Markdown大纲
3. 在结尾以无序列表的形式，提炼出3-5个最重要的关键知识点（Key Takeaways）
4. 使用清晰的Markdown格式，包括标题、列表、加粗等
5. 保持专业、简洁、易于理解

视频标题：{title}

字幕内容：
{subtitle}

请生成学习笔记：";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatMessage {
    pub role: &'static str,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system",
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user",
            content: content.into(),
        }
    }
}

/// Fill the first `{title}` and the first `{subtitle}` of the template.
pub fn render_prompt(template: Option<&str>, title: &str, transcript: &str) -> String {
    let template = template
        .filter(|t| !t.trim().is_empty())
        .unwrap_or(DEFAULT_PROMPT_TEMPLATE);

    template
        .replacen("{title}", title, 1)
        .replacen("{subtitle}", transcript, 1)
}

pub fn build_messages(system_prompt: Option<&str>, prompt: String) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(2);
    if let Some(system) = system_prompt.filter(|s| !s.trim().is_empty()) {
        messages.push(ChatMessage::system(system));
    }
    messages.push(ChatMessage::user(prompt));
    messages
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_template_is_filled() {
        let prompt = render_prompt(None, "费曼学习法", "今天聊费曼");
        assert!(prompt.contains("视频标题：费曼学习法"));
        assert!(prompt.contains("字幕内容：\n今天聊费曼"));
        assert!(!prompt.contains("{title}"));
    }

    #[test]
    fn only_first_placeholder_is_replaced() {
        let prompt = render_prompt(Some("{title} / {title}: {subtitle}"), "A", "B");
        assert_eq!(prompt, "A / {title}: B");
    }

    #[test]
    fn blank_template_uses_default() {
        let prompt = render_prompt(Some("   "), "T", "S");
        assert!(prompt.starts_with("你是一个专业的学习笔记生成助手"));
    }

    #[test]
    fn system_prompt_goes_first() {
        let messages = build_messages(Some("be brief"), "hello".into());
        assert_eq!(
            messages,
            vec![ChatMessage::system("be brief"), ChatMessage::user("hello")]
        );

        let messages = build_messages(Some(""), "hello".into());
        assert_eq!(messages, vec![ChatMessage::user("hello")]);
    }
}
