//! Verify envelope construction and response decoding against JSON test
//! vectors stored in `test-vectors/`.
//!
//! Request bodies are compared as parsed JSON, not raw strings, to avoid
//! false negatives from key ordering.

use gql_core::{Client, ClientError, HttpResponse, Response};
use serde_json::Value;

const ENDPOINT: &str = "http://localhost:3000/graphql";

fn simulated(sim: &Value) -> HttpResponse {
    let headers = sim["headers"]
        .as_array()
        .unwrap()
        .iter()
        .map(|h| {
            let arr = h.as_array().unwrap();
            (arr[0].as_str().unwrap().to_string(), arr[1].as_str().unwrap().to_string())
        })
        .collect();
    HttpResponse {
        status: sim["status"].as_u64().unwrap() as u16,
        headers,
        body: sim["body"].as_str().unwrap().as_bytes().to_vec(),
    }
}

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

#[test]
fn envelope_test_vectors() {
    let raw = include_str!("../../test-vectors/envelope.json");
    let vectors: Value = serde_json::from_str(raw).unwrap();

    let target = Client::new().target(ENDPOINT).unwrap();
    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let input = &case["input"];
        let expected_req = &case["expected_request"];

        let mut builder = target.request(input["document"].as_str().unwrap());
        for (key, value) in input["variables"].as_object().unwrap() {
            builder = builder.variable(key.clone(), value.clone());
        }
        for (key, value) in input["headers"].as_object().unwrap() {
            builder = builder.header(key.clone(), value.as_str().unwrap());
        }
        let req = builder.build().http_request().unwrap();

        assert_eq!(req.uri, ENDPOINT, "{name}: uri");

        let expected_headers: Vec<(String, String)> = expected_req["headers"]
            .as_array()
            .unwrap()
            .iter()
            .map(|h| {
                let arr = h.as_array().unwrap();
                (arr[0].as_str().unwrap().to_string(), arr[1].as_str().unwrap().to_string())
            })
            .collect();
        assert_eq!(req.headers, expected_headers, "{name}: headers");

        let req_body: Value = serde_json::from_str(&req.body).unwrap();
        assert_eq!(req_body, expected_req["body"], "{name}: body");
    }
}

// ---------------------------------------------------------------------------
// Response
// ---------------------------------------------------------------------------

#[test]
fn response_test_vectors() {
    let raw = include_str!("../../test-vectors/response.json");
    let vectors: Value = serde_json::from_str(raw).unwrap();

    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let result = Response::from_http(simulated(&case["simulated_response"]));

        if let Some(expected_error) = case.get("expected_error") {
            let err = result.unwrap_err();
            match expected_error.as_str().unwrap() {
                "HttpError" => assert!(
                    matches!(err, ClientError::HttpError { .. }),
                    "{name}: expected HttpError, got {err:?}"
                ),
                "DeserializationError" => assert!(
                    matches!(err, ClientError::DeserializationError(_)),
                    "{name}: expected DeserializationError, got {err:?}"
                ),
                other => panic!("{name}: unknown expected_error: {other}"),
            }
            continue;
        }

        let response = result.unwrap();
        let expected = &case["expected"];
        assert_eq!(
            response.has_data(),
            expected["has_data"].as_bool().unwrap(),
            "{name}: has_data"
        );
        assert_eq!(
            response.has_error(),
            expected["has_error"].as_bool().unwrap(),
            "{name}: has_error"
        );

        let messages: Vec<&str> = response.errors().iter().map(|e| e.message.as_str()).collect();
        let expected_messages: Vec<&str> = expected["error_messages"]
            .as_array()
            .unwrap()
            .iter()
            .map(|m| m.as_str().unwrap())
            .collect();
        assert_eq!(messages, expected_messages, "{name}: errors");

        let data = response.data().cloned().map(Value::Object).unwrap_or(Value::Null);
        assert_eq!(data, expected["data"], "{name}: data");
    }
}
