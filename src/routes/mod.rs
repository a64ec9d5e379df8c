pub mod analysis_routes;
pub mod fleet_routes;
pub mod info_routes;
pub mod stream_routes;

use axum::Router;

use crate::state::app_state::AppState;

pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(info_routes::health_routes(state.clone()))
        .merge(stream_routes::stream_routes(state.clone()))
        .merge(fleet_routes::fleet_routes(state.clone()))
        .merge(analysis_routes::analysis_routes(state))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::records::tests::{client_for, spawn_fake_store};
    use crate::client::records::RecordClient;
    use crate::models::fleet_model::FleetCatalog;
    use futures::StreamExt;
    use pm_stream::{SampleStream, SignalConfig, StreamOptions};
    use serde_json::{json, Value};
    use tokio_tungstenite::tungstenite::{self, Message};
    use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

    type WsClient = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

    async fn serve_state(records: Option<RecordClient>) -> (String, AppState) {
        let stream = SampleStream::new(
            SignalConfig::presets(),
            StreamOptions {
                seed: Some(3),
                ..Default::default()
            },
        )
        .unwrap();
        let state = AppState::new(stream.start_manual(), records, FleetCatalog::default());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let router = app(state.clone());
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        (format!("http://{}", addr), state)
    }

    async fn serve(records: Option<RecordClient>) -> String {
        serve_state(records).await.0
    }

    /// Next text message as JSON, skipping control frames.
    async fn next_json(ws: &mut WsClient) -> Value {
        loop {
            match ws.next().await.unwrap().unwrap() {
                Message::Text(text) => return serde_json::from_str(text.as_str()).unwrap(),
                Message::Close(_) => panic!("socket closed early"),
                _ => continue,
            }
        }
    }

    async fn get_json(url: String) -> Value {
        reqwest::get(url).await.unwrap().json().await.unwrap()
    }

    #[tokio::test]
    async fn stream_routes_serve_windows() {
        let base = serve(None).await;

        let health = get_json(format!("{base}/health")).await;
        assert_eq!(health["status"], "ok");
        assert_eq!(health["stream"], "running");

        let signals = get_json(format!("{base}/signals")).await;
        let signals = signals.as_array().unwrap();
        assert_eq!(signals.len(), 3);
        assert_eq!(signals[0]["id"], "vibration");
        assert_eq!(signals[0]["samples"], 20);
        assert_eq!(signals[2]["unit"], "RPM");

        let window = get_json(format!("{base}/signals/temperature/window")).await;
        assert_eq!(window["samples"].as_array().unwrap().len(), 20);
        assert_eq!(window["threshold"], 75.0);

        let missing = reqwest::get(format!("{base}/signals/pressure/window")).await.unwrap();
        assert_eq!(missing.status(), 404);

        let client = reqwest::Client::new();
        let paused: Value = client
            .post(format!("{base}/stream/pause"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(paused["paused"], true);
        assert_eq!(paused["frame"]["seq"], 0);

        let status = get_json(format!("{base}/stream")).await;
        assert_eq!(status["state"], "paused");

        let resumed: Value = client
            .post(format!("{base}/stream/resume"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(resumed["state"], "running");
    }

    #[tokio::test]
    async fn ws_pushes_frames_until_teardown() {
        let (base, state) = serve_state(None).await;
        let url = format!("{}/stream/ws", base.replacen("http", "ws", 1));
        let (mut ws, _) = connect_async(url.as_str()).await.unwrap();

        let first = next_json(&mut ws).await;
        assert_eq!(first["seq"], 0);
        assert_eq!(first["end_flag"], false);
        assert_eq!(first["windows"].as_array().unwrap().len(), 3);
        assert_eq!(first["windows"][0]["samples"].as_array().unwrap().len(), 20);

        assert!(state.stream.tick());
        let second = next_json(&mut ws).await;
        assert_eq!(second["seq"], 1);
        assert_eq!(second["end_flag"], false);
        let samples = second["windows"][1]["samples"].as_array().unwrap();
        assert_eq!(samples.len(), 20);
        assert_eq!(samples[19]["timestamp"], second["at"]);

        state.stream.teardown();
        let last = next_json(&mut ws).await;
        assert_eq!(last, json!({ "end_flag": true }));

        match connect_async(url.as_str()).await {
            Err(tungstenite::Error::Http(response)) => assert_eq!(response.status(), 410),
            Err(other) => panic!("unexpected error {other}"),
            Ok(_) => panic!("torn down stream accepted a subscriber"),
        }
    }

    #[tokio::test]
    async fn fleet_routes_classify_rows() {
        let base = serve(None).await;

        let equipment = get_json(format!("{base}/equipment")).await;
        let press = equipment
            .as_array()
            .unwrap()
            .iter()
            .find(|e| e["id"] == "press-d")
            .unwrap();
        assert_eq!(press["health_band"], "poor");
        assert_eq!(press["tone"], "danger");
        assert_eq!(press["is_fan"], false);

        let high = get_json(format!("{base}/alerts?min_severity=high")).await;
        assert_eq!(high.as_array().unwrap().len(), 1);
        assert_eq!(high[0]["equipment"], "Pump B");

        let fans = get_json(format!("{base}/fans")).await;
        assert_eq!(fans[1]["tone"], "caution");

        let response = reqwest::get(format!("{base}/alerts")).await.unwrap();
        assert_eq!(response.status(), 200);
        assert_eq!(
            response.headers()["content-type"],
            "application/json"
        );
        let all: Value = response.json().await.unwrap();
        assert!(all.as_array().unwrap().len() > 1);
        assert!(all.as_array().unwrap().iter().all(|a| a["tone"].is_string()));

        let metrics = get_json(format!("{base}/metrics")).await;
        assert_eq!(metrics.as_array().unwrap().len(), 4);
    }

    #[tokio::test]
    async fn analysis_routes_need_a_store() {
        let base = serve(None).await;
        let response = reqwest::Client::new()
            .post(format!("{base}/analysis"))
            .json(&json!({
                "user_id": "user-1",
                "upload_id": "00000000-0000-0000-0000-000000000000",
                "model_type": "random_forest"
            }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 503);
    }

    #[tokio::test]
    async fn upload_and_analysis_through_store() {
        let store = spawn_fake_store().await;
        let base = serve(Some(client_for(&store, "test-key"))).await;
        let client = reqwest::Client::new();

        let rejected = client
            .post(format!("{base}/uploads"))
            .json(&json!({ "user_id": "user-1", "filename": "notes.txt", "content": "x" }))
            .send()
            .await
            .unwrap();
        assert_eq!(rejected.status(), 400);

        let escaped = client
            .post(format!("{base}/uploads"))
            .json(&json!({ "user_id": "../user-2", "filename": "fan.csv", "content": "ts\n1\n" }))
            .send()
            .await
            .unwrap();
        assert_eq!(escaped.status(), 400);

        let created = client
            .post(format!("{base}/uploads"))
            .json(&json!({ "user_id": "user-1", "filename": "fan.csv", "content": "ts,rpm\n1,1250\n" }))
            .send()
            .await
            .unwrap();
        assert_eq!(created.status(), 201);
        let upload: Value = created.json().await.unwrap();
        assert_eq!(upload["rows_count"], 1);

        let analysis: Value = client
            .post(format!("{base}/analysis"))
            .json(&json!({
                "user_id": "user-1",
                "upload_id": upload["id"],
                "model_type": "isolation_forest"
            }))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(analysis["record"]["upload_id"], upload["id"]);
        assert_eq!(analysis["details"]["outlier_fraction"], 0.2);

        let results = get_json(format!("{base}/analysis/user-1")).await;
        assert_eq!(results.as_array().unwrap().len(), 1);
        let uploads = get_json(format!("{base}/uploads/user-1")).await;
        assert_eq!(uploads.as_array().unwrap().len(), 1);
    }
}
