use gemini_api::{Content, GenerateContentRequest, GenerationConfig};
use serde_json::json;

#[test]
fn request_serializes_contents_with_roles() {
    let request = GenerateContentRequest::new(vec![
        Content::user("hello"),
        Content::model("hi there"),
        Content::user("more"),
    ]);

    let value = serde_json::to_value(&request).expect("request should serialize");
    assert_eq!(
        value,
        json!({
            "contents": [
                {"role": "user", "parts": [{"text": "hello"}]},
                {"role": "model", "parts": [{"text": "hi there"}]},
                {"role": "user", "parts": [{"text": "more"}]},
            ]
        })
    );
}

#[test]
fn request_serializes_system_instruction_without_role() {
    let request = GenerateContentRequest::new(vec![Content::user("q")])
        .with_system_instruction("be helpful");

    let value = serde_json::to_value(&request).expect("request should serialize");
    assert_eq!(
        value["systemInstruction"],
        json!({"parts": [{"text": "be helpful"}]})
    );
}

#[test]
fn generation_config_serializes_camel_case_thinking_budget() {
    let request = GenerateContentRequest::new(vec![Content::user("q")]).with_generation_config(
        GenerationConfig::default()
            .with_temperature(0.7)
            .with_thinking_budget(24576),
    );

    let value = serde_json::to_value(&request).expect("request should serialize");
    assert_eq!(
        value["generationConfig"],
        json!({
            "temperature": 0.7,
            "thinkingConfig": {"thinkingBudget": 24576},
        })
    );
}

#[test]
fn optional_sections_are_omitted_when_unset() {
    let request = GenerateContentRequest::new(vec![Content::user("q")]);

    let value = serde_json::to_value(&request).expect("request should serialize");
    let object = value.as_object().expect("request should be an object");
    assert!(!object.contains_key("systemInstruction"));
    assert!(!object.contains_key("generationConfig"));
}
