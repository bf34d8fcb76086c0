use curled_mail::config::Config;
use curled_mail::{CurledMail, MailError, MemoryTransport, TemplateDefinition, TransportError};
use serde_json::json;

const CONFIG: &str = r#"
[templates.welcome]
from = "noreply@example.com"
to = "{{email}}"
subject = "Hi {{name}}"
html = "<b>{{name}}</b>"

[templates.report]
from = "reports@example.com"
to = "{{email}}"
subject = "Report {{period}}"
text = "Your {{period}} report is attached."
attachments = [
  { filename = "summary-{{period}}.txt", data = "Total: {{total}}" },
  { filename = "readme.txt", data = "Generated for {{name}}" },
]
"#;

fn client() -> CurledMail<MemoryTransport> {
    let config = Config::from_toml(CONFIG).unwrap();
    let mut client = CurledMail::with_transport(MemoryTransport::new());
    client.add_templates(&config).unwrap();
    client
}

#[tokio::test]
async fn test_send_from_config() {
    let client = client();

    let outcome = client
        .send("welcome", &json!({ "name": "Ada", "email": "ada@example.com" }))
        .await
        .unwrap();
    assert!(outcome.is_sent());

    let messages = client.transport().messages();
    assert_eq!(messages.len(), 1);
    assert_eq!(
        messages[0].to_value(),
        json!({
            "from": "noreply@example.com",
            "to": "ada@example.com",
            "subject": "Hi Ada",
            "text": "**Ada**",
            "attachment": [{ "data": "<b>Ada</b>", "alternative": true }],
            "attachments": []
        })
    );
}

#[tokio::test]
async fn test_attachment_templates_and_data_attachments() {
    let client = client();

    client
        .send(
            "report",
            &json!({
                "name": "Grace",
                "email": "grace@example.com",
                "period": "2024-Q1",
                "total": 42,
                "_attachments": [{ "path": "/var/reports/full.pdf", "type": "application/pdf" }],
            }),
        )
        .await
        .unwrap();

    let message = &client.transport().messages()[0];
    assert_eq!(message.text(), Some("Your 2024-Q1 report is attached."));
    assert_eq!(
        message.to_value()["attachment"],
        json!([
            { "filename": "summary-2024-Q1.txt", "data": "Total: 42" },
            { "filename": "readme.txt", "data": "Generated for Grace" },
            { "path": "/var/reports/full.pdf", "type": "application/pdf" },
        ])
    );
    assert_eq!(message.to_value()["attachments"], json!([]));
}

#[tokio::test]
async fn test_concurrent_sends() {
    let client = client();

    let ada = json!({ "name": "Ada", "email": "ada@example.com" });
    let grace = json!({ "name": "Grace", "email": "grace@example.com" });
    let (first, second) = tokio::join!(
        client.send("welcome", &ada),
        client.send("welcome", &grace),
    );

    assert!(first.unwrap().is_sent());
    assert!(second.unwrap().is_sent());

    let mut subjects: Vec<String> = client
        .transport()
        .messages()
        .iter()
        .filter_map(|m| m.subject().map(str::to_string))
        .collect();
    subjects.sort();
    assert_eq!(subjects, vec!["Hi Ada", "Hi Grace"]);
}

#[tokio::test]
async fn test_unknown_template() {
    let client = client();

    let result = client.send("unknownKey", &json!({})).await;

    assert!(matches!(result, Err(MailError::NotFound(_))));
    assert!(client.transport().is_empty());
}

#[tokio::test]
async fn test_failing_transport_resolves() {
    let mut client = CurledMail::with_transport(MemoryTransport::failing("connection refused"));
    client
        .add_template("ping", TemplateDefinition::new().field("subject", "ping"))
        .unwrap();

    let outcome = client.send("ping", &json!({})).await.unwrap();

    assert!(!outcome.is_sent());
    assert!(matches!(
        outcome.error(),
        Some(TransportError::Rejected(reason)) if reason == "connection refused"
    ));
}

#[tokio::test]
async fn test_builder_definition_with_attachment() {
    let mut client = CurledMail::with_transport(MemoryTransport::new());
    client
        .add_template(
            "invoice",
            TemplateDefinition::new()
                .field("subject", "Invoice {{number}}")
                .field("html", "<p>Invoice <b>{{number}}</b></p>")
                .field("text", "")
                .attachment([("filename", "invoice-{{number}}.txt"), ("data", "{{amount}}")]),
        )
        .unwrap();

    let message = client
        .render("invoice", &json!({ "number": 7, "amount": "12.50" }))
        .unwrap();

    assert_eq!(message.subject(), Some("Invoice 7"));
    assert_eq!(message.text(), Some("Invoice **7**"));
    assert_eq!(
        message.to_value()["attachment"],
        json!([
            { "filename": "invoice-7.txt", "data": "12.50" },
            { "data": "<p>Invoice <b>7</b></p>", "alternative": true },
        ])
    );
}
