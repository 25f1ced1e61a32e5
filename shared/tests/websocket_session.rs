use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use shared::{
    Entitlement, JobInputs, JobRequest, JobSession, Prompt, SessionStage, SessionStep, WsConnector,
};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio_tungstenite::tungstenite::Message;

/// One-shot job server: accepts a connection, reports the request it got,
/// then streams `frames` and waits for the client to hang up.
async fn serve(frames: Vec<&'static str>) -> (String, oneshot::Receiver<Value>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (request_tx, request_rx) = oneshot::channel();

    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();

        if let Some(Ok(Message::Text(text))) = ws.next().await {
            let _ = request_tx.send(serde_json::from_str::<Value>(text.as_str()).unwrap());
        }
        for frame in frames {
            ws.send(Message::Text(frame.into())).await.unwrap();
        }
        while let Some(Ok(message)) = ws.next().await {
            if message.is_close() {
                break;
            }
        }
    });

    (format!("ws://{}", addr), request_rx)
}

fn request() -> JobRequest {
    JobRequest::prepare(
        JobInputs {
            video_url: "https://youtube.com/watch?v=abc".to_string(),
            target_language: "Spanish".to_string(),
            api_key: Some("sk-test".to_string()),
            ..Default::default()
        },
        Some(&Entitlement {
            token: "tok".to_string(),
            has_stored_api_key: false,
        }),
    )
    .unwrap()
}

#[tokio::test]
async fn streams_a_job_over_websocket() {
    let (endpoint, request_rx) = serve(vec![
        r#"{"type":"PROCESSING_STARTED","data":{"message":"Processing started"}}"#,
        r#"{"type":"DOWNLOAD_PROGRESS","data":{"progress":50}}"#,
        r#"{"type":"TRANSCRIPTION_PROGRESS","data":{"progress":100,"transcription":"hello"}}"#,
        r#"{"type":"TRANSLATION_PROGRESS","data":{"progress":100,"currentTranslation":"hola"}}"#,
        r#"{"type":"PROCESSING_COMPLETE","data":{"transcription":"hello world","translation":"hola mundo","initialLanguage":"English"}}"#,
    ])
    .await;

    let mut session = JobSession::new(WsConnector, endpoint);
    session.submit(&request()).await.unwrap();

    while !session.state().is_finished() {
        let step = session.next_step().await.unwrap();
        assert_eq!(step, SessionStep::Updated { prompt: None });
    }

    let state = session.state();
    assert_eq!(state.stage, SessionStage::Complete);
    assert_eq!(state.overall_percent, 100);
    assert_eq!(state.transcript, "hello world");
    assert_eq!(state.translation, "hola mundo");
    assert_eq!(state.detected_language, "English");

    let sent = request_rx.await.unwrap();
    assert_eq!(sent["videoUrl"], "https://youtube.com/watch?v=abc");
    assert_eq!(sent["targetLang"], "Spanish");
    assert_eq!(sent["token"], "tok");
    assert_eq!(sent["openaiApiKey"], "sk-test");

    session.reset().await;
}

#[tokio::test]
async fn server_error_asks_for_login() {
    let (endpoint, _request_rx) = serve(vec![
        r#"{"type":"ERROR","data":{"error":"Authentication required","requiresAuth":true}}"#,
    ])
    .await;

    let mut session = JobSession::new(WsConnector, endpoint);
    session.submit(&request()).await.unwrap();

    let step = session.next_step().await.unwrap();
    assert_eq!(
        step,
        SessionStep::Updated {
            prompt: Some(Prompt::Login)
        }
    );
    assert_eq!(session.state().stage, SessionStage::Failed);
    assert_eq!(
        session.state().error_message.as_deref(),
        Some("Authentication required")
    );
}

#[tokio::test]
async fn unreachable_server_fails_the_session() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let endpoint = format!("ws://{}", listener.local_addr().unwrap());
    drop(listener);

    let mut session = JobSession::new(WsConnector, endpoint);
    session.submit(&request()).await.unwrap();
    session.next_step().await.unwrap();

    assert_eq!(session.state().stage, SessionStage::Failed);
    assert_eq!(session.state().overall_percent, 0);
    assert_eq!(
        session.state().error_message.as_deref(),
        Some(shared::CONNECTION_ERROR)
    );
}

#[tokio::test]
async fn reset_closes_an_open_job() {
    let (endpoint, _request_rx) =
        serve(vec![r#"{"type":"DOWNLOAD_PROGRESS","data":{"progress":100}}"#]).await;

    let mut session = JobSession::new(WsConnector, endpoint);
    session.submit(&request()).await.unwrap();

    assert_eq!(
        session.next_step().await,
        Some(SessionStep::Updated { prompt: None })
    );
    assert_eq!(session.state().overall_percent, 20);
    session.reset().await;
    assert_eq!(session.state().stage, SessionStage::Idle);
}
