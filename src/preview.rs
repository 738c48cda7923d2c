use serde_json::{json, Value};

/// Example of the document shape the relay produces. Documentation only.
pub fn sample_workflow() -> Value {
    json!({
        "name": "Sample Sheet -> Slack",
        "active": false,
        "nodes": [
            {
                "name": "Google Sheets Trigger",
                "type": "n8n-nodes-base.googleSheets",
                "typeVersion": 1,
                "position": [250, 300],
                "parameters": { "operation": "watch", "sheetId": "YOUR_SHEET_ID" }
            },
            {
                "name": "Slack",
                "type": "n8n-nodes-base.slack",
                "typeVersion": 1,
                "position": [600, 300],
                "parameters": { "channel": "#alerts", "text": "New row: {{$json[\"values\"]}}" },
                "credentials": { "slackApi": "{{CREDENTIALS.slack}}" }
            }
        ],
        "connections": {
            "Google Sheets Trigger": {
                "main": [[{ "node": "Slack", "type": "main", "index": 0 }]]
            }
        }
    })
}
