use chatgen::{
    decode_access, decode_chat_message, decode_dispatch_request, decode_request, decode_tool,
    Access, ChatMessage, ContextMethod, Dialect, DocType, Error, ImageMimeType, ModelPart,
    Particle, Role, Tool, ToolsPolicy, UserPart,
};
use serde_json::{json, Value};

fn round_trip<T>(value: Value) -> Value
where
    T: serde::Serialize + serde::de::DeserializeOwned,
{
    let decoded: T = serde_json::from_value(value).unwrap();
    serde_json::to_value(decoded).unwrap()
}

#[test]
fn test_user_message_parts_keep_their_wire_shape() {
    let message = json!({
        "role": "user",
        "parts": [
            {"pt": "text", "text": "What is in this image?"},
            {"pt": "inline_image", "mimeType": "image/png", "base64": "iVBORw0KGgo="},
            {
                "pt": "doc",
                "type": "text/markdown",
                "ref": "notes.md",
                "l1Title": "Notes",
                "data": {"idt": "text", "text": "# Notes", "mimeType": "text/markdown"}
            },
            {"pt": "meta_reply_to", "replyTo": "the second paragraph"}
        ]
    });
    assert_eq!(round_trip::<ChatMessage>(message.clone()), message);

    let decoded = decode_chat_message(&message.to_string()).unwrap();
    assert_eq!(decoded.role(), Role::User);
    let ChatMessage::User { parts } = decoded else {
        panic!("expected a user message");
    };
    assert!(matches!(&parts[1], UserPart::InlineImage(image) if image.mime_type == ImageMimeType::Png));
    match &parts[2] {
        UserPart::Doc(doc) => {
            assert_eq!(doc.doc_type, DocType::Markdown);
            assert_eq!(doc.text(), "# Notes");
        }
        other => panic!("expected a doc part, got {other:?}"),
    }
}

#[test]
fn test_model_and_tool_messages() {
    let model = json!({
        "role": "model",
        "parts": [
            {"pt": "text", "text": "Let me check."},
            {
                "pt": "tool_call",
                "id": "call_1",
                "call": {"type": "function_call", "name": "get_weather", "args": "{\"city\":\"Paris\"}"}
            },
            {
                "pt": "tool_call",
                "id": "exec_1",
                "call": {"type": "code_execution", "variant": "gemini_auto_inline", "language": "python", "code": "print(1)"}
            }
        ]
    });
    assert_eq!(round_trip::<ChatMessage>(model.clone()), model);

    let tool = json!({
        "role": "tool",
        "parts": [
            {
                "pt": "tool_response",
                "id": "call_1",
                "response": {"type": "function_call", "result": "18C", "_name": "get_weather"},
                "error": "timeout after retry"
            },
            {
                "pt": "tool_response",
                "id": "exec_1",
                "response": {"type": "code_execution", "result": "1"},
                "error": false
            }
        ]
    });
    assert_eq!(round_trip::<ChatMessage>(tool.clone()), tool);

    let parsed = decode_chat_message(&model.to_string()).unwrap();
    let ChatMessage::Model { parts } = parsed else {
        panic!("expected a model message");
    };
    assert!(matches!(parts[0], ModelPart::Text(_)));
}

#[test]
fn test_function_call_without_args_decodes_as_none() {
    let message = decode_chat_message(
        r#"{"role":"model","parts":[{"pt":"tool_call","id":"c","call":{"type":"function_call","name":"now"}}]}"#,
    )
    .unwrap();
    assert_eq!(
        message,
        ChatMessage::Model {
            parts: vec![ModelPart::function_call("c", "now", None)]
        }
    );
}

#[test]
fn test_request_with_tools_and_policy() {
    let request = json!({
        "systemMessage": {"parts": [{"pt": "text", "text": "You are terse."}]},
        "chatSequence": [{"role": "user", "parts": [{"pt": "text", "text": "Weather?"}]}],
        "tools": [{
            "type": "function_call",
            "function_call": {
                "name": "get_weather",
                "description": "Current weather for a city",
                "input_schema": {
                    "properties": {"city": {"type": "string", "description": "City name"}},
                    "required": ["city"]
                }
            }
        }],
        "toolsPolicy": {"type": "function_call", "function_call": {"name": "get_weather"}}
    });

    let decoded = decode_request(&request.to_string()).unwrap();
    assert_eq!(decoded.tools_policy, Some(ToolsPolicy::function("get_weather")));
    assert_eq!(serde_json::to_value(&decoded).unwrap(), request);

    let bad_policy = json!({
        "chatSequence": [],
        "toolsPolicy": {"type": "function_call", "function_call": {"name": "get weather"}}
    });
    let err = decode_request(&bad_policy.to_string()).unwrap_err();
    assert!(err.to_string().contains("toolsPolicy"));
}

#[test]
fn test_tool_names_are_bounded() {
    let long_name = "a".repeat(65);
    let tool = json!({"type": "function_call", "function_call": {"name": long_name, "description": "x"}});
    assert!(matches!(decode_tool(&tool.to_string()), Err(Error::Validation(_))));

    let ok = json!({"type": "function_call", "function_call": {"name": "a-b_c9", "description": "x"}});
    assert!(decode_tool(&ok.to_string()).is_ok());

    let code = decode_tool(r#"{"type":"code_execution","variant":"gemini_auto_inline"}"#).unwrap();
    assert!(matches!(code, Tool::CodeExecution { .. }));
}

#[test]
fn test_unknown_discriminators_are_rejected() {
    let cases = [
        r#"{"role":"user","parts":[{"pt":"audio","data":"..."}]}"#,
        r#"{"role":"system","parts":[{"pt":"text","text":"hi"}]}"#,
        r#"{"role":"model","parts":[{"pt":"doc","type":"text/plain","ref":"r","data":{"idt":"text","text":"x"}}]}"#,
        r#"{"role":"tool","parts":[{"pt":"text","text":"hi"}]}"#,
    ];
    for case in cases {
        assert!(
            matches!(decode_chat_message(case), Err(Error::Validation(_))),
            "accepted {case}"
        );
    }

    assert!(decode_request(r#"{"chatSequence":[],"tools":[{"type":"retrieval"}]}"#).is_err());
    assert!(decode_access(r#"{"dialect":"bedrock","oaiKey":"k"}"#).is_err());
}

#[test]
fn test_access_dialects() {
    let access = decode_access(r#"{"dialect":"togetherai","oaiKey":"k","oaiHost":"https://api.together.xyz"}"#)
        .unwrap();
    assert_eq!(access.dialect(), Dialect::TogetherAi);
    assert_eq!(
        access.as_openai().and_then(|a| a.oai_host.as_deref()),
        Some("https://api.together.xyz")
    );

    let ollama = decode_access(r#"{"dialect":"ollama"}"#).unwrap();
    assert_eq!(ollama.dialect(), Dialect::Ollama);
    assert!(ollama.as_openai().is_none());

    let gemini = decode_access(
        r#"{"dialect":"gemini","geminiKey":"g","minSafetyLevel":"BLOCK_ONLY_HIGH"}"#,
    )
    .unwrap();
    assert!(matches!(gemini, Access::Gemini(_)));
}

#[test]
fn test_dispatch_request_checks_model_parameters() {
    let mut request = json!({
        "access": {"dialect": "openai", "oaiKey": "sk-test"},
        "model": {"id": "gpt-4o-mini", "temperature": 0.7, "maxTokens": 1024},
        "chatGenerate": {"chatSequence": [{"role": "user", "parts": [{"pt": "text", "text": "Hi"}]}]},
        "context": {"method": "chat-stream", "name": "conversation", "ref": "conv-1"},
        "streaming": true
    });

    let decoded = decode_dispatch_request(&request.to_string()).unwrap();
    assert_eq!(decoded.context.method, ContextMethod::ChatStream);
    assert_eq!(decoded.model.max_tokens, Some(1024));

    request["model"]["temperature"] = json!(2.5);
    let err = decode_dispatch_request(&request.to_string()).unwrap_err();
    assert!(err.to_string().contains("temperature"));

    request["model"]["temperature"] = json!(1.0);
    request["model"]["maxTokens"] = json!(0);
    assert!(decode_dispatch_request(&request.to_string()).is_err());
}

#[test]
fn test_particles_are_tagged_by_kind() {
    let particle: Particle = serde_json::from_value(json!({"kind": "text", "delta": "Hi"})).unwrap();
    assert_eq!(particle, Particle::text("Hi"));
    assert!(serde_json::from_value::<Particle>(json!({"kind": "reasoning", "delta": "?"})).is_err());
}
