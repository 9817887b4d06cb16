//! Prompt templates for the prompt-completion families

use crate::error::LlmError;
use crate::types::{CompletionRequest, Message, Role};

/// Text content of a message; image parts cannot be rendered into a prompt
pub(crate) fn text_of(message: &Message, model: &str) -> Result<String, LlmError> {
    if message.content.has_images() {
        return Err(LlmError::UnsupportedContent(format!(
            "model {model} only accepts text content"
        )));
    }
    Ok(message.content.as_text())
}

/// `<|begin_of_text|>` prompt with one header block per message
pub(crate) fn llama3(request: &CompletionRequest) -> Result<String, LlmError> {
    let mut prompt = String::from("<|begin_of_text|>");
    for message in &request.messages {
        let text = text_of(message, &request.model)?;
        prompt.push_str("<|start_header_id|>");
        prompt.push_str(message.role.as_str());
        prompt.push_str("<|end_header_id|>\n\n");
        prompt.push_str(&text);
        prompt.push_str("<|eot_id|>");
    }
    prompt.push_str("<|start_header_id|>assistant<|end_header_id|>\n\n");
    Ok(prompt)
}

/// `[INST]` prompt used by Llama 2 and Mistral
///
/// System messages are hoisted into the first instruction, wrapped in
/// `<<SYS>>` tags when `sys_tags` is set.
pub(crate) fn instruct(request: &CompletionRequest, sys_tags: bool) -> Result<String, LlmError> {
    let mut system = String::new();
    let mut turns = String::new();
    let mut after_reply = false;

    for message in &request.messages {
        let text = text_of(message, &request.model)?;
        match message.role {
            Role::System => {
                system.push('\n');
                system.push_str(&text);
                system.push('\n');
            }
            Role::User => {
                if after_reply {
                    turns.push_str("<s>[INST] ");
                }
                turns.push_str(&text);
                turns.push_str(" [/INST] ");
                after_reply = false;
            }
            Role::Assistant | Role::Tool => {
                turns.push_str(&text);
                turns.push_str("</s>");
                after_reply = true;
            }
        }
    }

    let mut prompt = String::from("<s>[INST] ");
    if sys_tags && !system.is_empty() {
        prompt.push_str("<<SYS>>");
        prompt.push_str(&system);
        prompt.push_str("<</SYS>>");
    } else {
        prompt.push_str(&system);
    }
    prompt.push_str(&turns);
    Ok(prompt)
}

/// `<|role|>content</s>` prompt for custom imported models
pub(crate) fn role_tagged(request: &CompletionRequest) -> Result<String, LlmError> {
    let mut prompt = String::new();
    for message in &request.messages {
        let text = text_of(message, &request.model)?;
        prompt.push_str("<|");
        prompt.push_str(message.role.as_str());
        prompt.push_str("|>");
        prompt.push_str(&text);
        prompt.push_str("</s>");
    }
    prompt.push_str("<|assistant|>");
    Ok(prompt)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::test_support::{message, request};
    use crate::types::{Content, ContentPart};

    fn conversation() -> CompletionRequest {
        request(vec![
            message(Role::System, "Be brief."),
            message(Role::User, "Hi"),
            message(Role::Assistant, "Hello!"),
            message(Role::User, "Bye"),
        ])
    }

    #[test]
    fn llama3_prompt_uses_header_blocks() {
        let prompt = llama3(&conversation()).unwrap();
        assert_eq!(
            prompt,
            "<|begin_of_text|>\
             <|start_header_id|>system<|end_header_id|>\n\nBe brief.<|eot_id|>\
             <|start_header_id|>user<|end_header_id|>\n\nHi<|eot_id|>\
             <|start_header_id|>assistant<|end_header_id|>\n\nHello!<|eot_id|>\
             <|start_header_id|>user<|end_header_id|>\n\nBye<|eot_id|>\
             <|start_header_id|>assistant<|end_header_id|>\n\n"
        );
    }

    #[test]
    fn llama2_prompt_wraps_the_system_prompt() {
        let prompt = instruct(&conversation(), true).unwrap();
        assert_eq!(
            prompt,
            "<s>[INST] <<SYS>>\nBe brief.\n<</SYS>>Hi [/INST] Hello!</s><s>[INST] Bye [/INST] "
        );
    }

    #[test]
    fn mistral_prompt_inlines_the_system_prompt() {
        let prompt = instruct(&conversation(), false).unwrap();
        assert_eq!(prompt, "<s>[INST] \nBe brief.\nHi [/INST] Hello!</s><s>[INST] Bye [/INST] ");
    }

    #[test]
    fn instruct_prompt_without_system_has_no_tags() {
        let prompt = instruct(&request(vec![message(Role::User, "Hi")]), true).unwrap();
        assert_eq!(prompt, "<s>[INST] Hi [/INST] ");
    }

    #[test]
    fn role_tagged_prompt_ends_with_assistant_tag() {
        let prompt = role_tagged(&request(vec![message(Role::User, "Hi")])).unwrap();
        assert_eq!(prompt, "<|user|>Hi</s><|assistant|>");
    }

    #[test]
    fn text_parts_are_concatenated_and_images_rejected() {
        let mut req = request(vec![Message {
            content: Content::Parts(vec![
                ContentPart::Text { text: "a".to_owned() },
                ContentPart::Text { text: "b".to_owned() },
            ]),
            ..message(Role::User, "")
        }]);
        assert!(role_tagged(&req).unwrap().starts_with("<|user|>ab</s>"));

        req.messages[0].content = Content::Parts(vec![ContentPart::Image {
            url: "data:image/png;base64,AAAA".to_owned(),
            detail: None,
        }]);
        assert!(matches!(llama3(&req), Err(LlmError::UnsupportedContent(_))));
    }
}
