//! Document shell.

use super::text;

/// Generate the HTML shell for the application.
#[must_use]
pub fn html_shell(title: &str, content: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en" class="dark">
<head>
    <meta charset="utf-8">
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <meta name="description" content="Chat with an agent that reasons, cites sources and calls tools">
    <title>{title} - Agent Chat</title>
    <link rel="stylesheet" href="/static/app.css">
    <script defer src="/static/chat.js"></script>
</head>
<body class="min-h-screen antialiased">
    <div id="app-shell" class="app-shell">
        <header class="app-header">
            <a href="/" class="brand">
                <svg class="icon" xmlns="http://www.w3.org/2000/svg" viewBox="0 0 24 24" fill="none" stroke="currentColor" stroke-width="2">
                    <path d="m12 3-1.912 5.813a2 2 0 0 1-1.275 1.275L3 12l5.813 1.912a2 2 0 0 1 1.275 1.275L12 21l1.912-5.813a2 2 0 0 1 1.275-1.275L21 12l-5.813-1.912a2 2 0 0 1-1.275-1.275L12 3Z"/>
                </svg>
                <span>Agent Chat</span>
            </a>
        </header>

        <main id="app" class="app-main">
            {content}
        </main>
    </div>
</body>
</html>"#,
        title = text(title),
    )
}

/// Chat page body: the conversation above the composer.
#[must_use]
pub fn chat_page(session_id: &str, conversation: &str, composer: &str) -> String {
    let content = format!(
        r#"<section class="chat" data-stream-url="/api/sessions/{session}/stream">
    {conversation}
    {composer}
</section>"#,
        session = super::attr(session_id),
    );
    html_shell("Chat", &content)
}
