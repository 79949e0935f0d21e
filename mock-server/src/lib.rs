//! GraphQL-shaped mock endpoint serving a fixed people directory.
//!
//! # Design
//! This is not a GraphQL engine. The handler reads the envelope, extracts
//! the root field of the document and its arguments, and answers with a
//! canned payload. Selection sets are ignored: every person is returned
//! with all of its fields, which is what the client's partial-binding tests
//! need.
//!
//! Root fields: `people`, `person(id)`, `peopleWithSurname(surname)`,
//! `failures(count)`, `partial`, `whoami`, `slow(millis)`, `blob(bytes)`.
//! Anything else is answered with a GraphQL validation error.
//! `POST /status/{code}` answers with the given status for transport-failure
//! tests; `POST /raw/{code}` does the same with a body that is not UTF-8.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tokio::net::TcpListener;
use tracing::debug;

pub const PEOPLE: usize = 100;
/// Body served by `POST /raw/{code}`.
pub const RAW_BODY: &[u8] = &[0xff, 0xfe, b'b', b'a', b'd'];
const SURNAMES: [&str; 4] = ["Grant", "Smith", "Jones", "Brown"];

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    pub code: String,
    pub lines: Vec<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Person {
    pub id: i64,
    pub names: Vec<String>,
    pub surname: String,
    pub birth_date: String,
    pub addresses: Vec<Address>,
}

/// Incoming envelope.
#[derive(Deserialize)]
pub struct GraphQLRequest {
    pub query: String,
    #[serde(default)]
    pub variables: Map<String, Value>,
}

pub type Db = Arc<Vec<Person>>;

pub fn people() -> Vec<Person> {
    (1..=PEOPLE as i64)
        .map(|id| Person {
            id,
            names: vec![format!("Name{id}")],
            surname: SURNAMES[(id as usize - 1) % SURNAMES.len()].to_string(),
            birth_date: format!("19{:02}-01-01", id % 100),
            addresses: vec![Address {
                code: format!("{:05}", 1000 + id),
                lines: vec![format!("{id} Main Street")],
            }],
        })
        .collect()
}

pub fn app() -> Router {
    let db: Db = Arc::new(people());
    Router::new()
        .route("/graphql", post(graphql))
        .route("/status/{code}", post(status))
        .route("/raw/{code}", post(raw))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

async fn status(Path(code): Path<u16>) -> Response {
    let status = StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, format!("status {code}")).into_response()
}

async fn raw(Path(code): Path<u16>) -> Response {
    let status = StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, RAW_BODY).into_response()
}

async fn graphql(
    State(db): State<Db>,
    headers: HeaderMap,
    Json(request): Json<GraphQLRequest>,
) -> Response {
    debug!(query = %request.query, "mock GraphQL request");
    let body = match RootField::parse(&request.query) {
        Some(field) => resolve(&db, &headers, &field, &request.variables).await,
        None => errors(&["Invalid Syntax"]),
    };
    ([("x-mock-server", "people")], Json(body)).into_response()
}

async fn resolve(
    db: &Db,
    headers: &HeaderMap,
    field: &RootField,
    variables: &Map<String, Value>,
) -> Value {
    let args = match field.arguments(variables) {
        Ok(args) => args,
        Err(message) => return json!({ "errors": [{ "message": message }], "data": null }),
    };
    match field.name.as_str() {
        "people" => json!({ "data": { "people": db.as_slice() } }),
        "person" => {
            let id = args.get("id").and_then(Value::as_i64);
            let person = db.iter().find(|p| Some(p.id) == id);
            json!({ "data": { "person": person } })
        }
        "peopleWithSurname" => {
            let surname = args.get("surname").and_then(Value::as_str).unwrap_or_default();
            let matches: Vec<&Person> = db.iter().filter(|p| p.surname == surname).collect();
            json!({ "data": { "peopleWithSurname": matches } })
        }
        "failures" => {
            let count = args.get("count").and_then(Value::as_u64).unwrap_or(1);
            let messages: Vec<String> = (1..=count).map(|i| format!("failure {i}")).collect();
            let refs: Vec<&str> = messages.iter().map(String::as_str).collect();
            errors(&refs)
        }
        "partial" => json!({
            "data": { "partial": { "id": 1, "strength": null } },
            "errors": [{
                "message": "strength unavailable",
                "locations": [{ "line": 1, "column": 3 }],
                "path": ["partial", "strength"],
                "extensions": { "code": "UNAVAILABLE" }
            }]
        }),
        "whoami" => {
            let auth = headers
                .get("authorization")
                .and_then(|v| v.to_str().ok());
            json!({ "data": { "whoami": auth } })
        }
        "slow" => {
            let millis = args.get("millis").and_then(Value::as_u64).unwrap_or(0);
            tokio::time::sleep(Duration::from_millis(millis)).await;
            json!({ "data": { "slow": millis } })
        }
        "blob" => {
            let bytes = args.get("bytes").and_then(Value::as_u64).unwrap_or(0);
            json!({ "data": { "blob": "x".repeat(bytes as usize) } })
        }
        other => {
            let message = format!(
                "Validation error of type FieldUndefined: Field '{other}' in type 'Query' is undefined"
            );
            json!({
                "errors": [{
                    "message": message,
                    "locations": [{ "line": 1, "column": field.column }]
                }]
            })
        }
    }
}

fn errors(messages: &[&str]) -> Value {
    let errors: Vec<Value> = messages.iter().map(|m| json!({ "message": m })).collect();
    json!({ "errors": errors })
}

/// First field of the operation's selection set.
#[derive(Debug, PartialEq)]
pub struct RootField {
    pub name: String,
    /// Raw `name: value` argument pairs.
    pub args: Vec<(String, String)>,
    /// 1-based column of the field name.
    pub column: usize,
}

impl RootField {
    pub fn parse(document: &str) -> Option<Self> {
        let open = document.find('{')?;
        let rest = &document[open + 1..];
        let start = open + 1 + (rest.len() - rest.trim_start().len());
        let name: String = document[start..]
            .chars()
            .take_while(|c| c.is_ascii_alphanumeric() || *c == '_')
            .collect();
        if name.is_empty() {
            return None;
        }

        let after = document[start + name.len()..].trim_start();
        let mut args = Vec::new();
        if let Some(inner) = after.strip_prefix('(') {
            let close = inner.find(')')?;
            for pair in inner[..close].split(',').filter(|p| !p.trim().is_empty()) {
                let (key, value) = pair.split_once(':')?;
                args.push((key.trim().to_string(), value.trim().to_string()));
            }
        }
        Some(Self {
            name,
            args,
            column: start + 1,
        })
    }

    /// Resolve literals and `$variable` references. A referenced variable
    /// that was not supplied is an error message.
    pub fn arguments(&self, variables: &Map<String, Value>) -> Result<Map<String, Value>, String> {
        let mut resolved = Map::new();
        for (key, raw) in &self.args {
            let value = if let Some(var) = raw.strip_prefix('$') {
                variables
                    .get(var)
                    .cloned()
                    .ok_or_else(|| format!("Variable '{var}' has not been set"))?
            } else if let Some(text) = raw.strip_prefix('"').and_then(|r| r.strip_suffix('"')) {
                Value::String(text.to_string())
            } else {
                serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.clone()))
            };
            resolved.insert(key.clone(), value);
        }
        Ok(resolved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn people_are_deterministic() {
        let people = people();
        assert_eq!(people.len(), PEOPLE);
        assert_eq!(people[49].id, 50);
        assert_eq!(people[0].surname, "Grant");
    }

    #[test]
    fn person_serializes_camel_case() {
        let json = serde_json::to_value(&people()[0]).unwrap();
        assert_eq!(json["birthDate"], "1901-01-01");
        assert_eq!(json["addresses"][0]["code"], "01001");
    }

    #[test]
    fn parses_shorthand_query() {
        let field = RootField::parse("{ people { id } }").unwrap();
        assert_eq!(field.name, "people");
        assert!(field.args.is_empty());
        assert_eq!(field.column, 3);
    }

    #[test]
    fn parses_named_operation_with_arguments() {
        let field = RootField::parse("query q($id: Int!) { person(id: $id) { id } }").unwrap();
        assert_eq!(field.name, "person");
        assert_eq!(field.args, vec![("id".to_string(), "$id".to_string())]);
    }

    #[test]
    fn rejects_documents_without_selection() {
        assert!(RootField::parse("GraphQL request here").is_none());
        assert!(RootField::parse("{ }").is_none());
    }

    #[test]
    fn resolves_literals_and_variables() {
        let field = RootField::parse(r#"{ f(a: 1, b: "x", c: $c) }"#).unwrap();
        let mut variables = Map::new();
        variables.insert("c".to_string(), json!(true));
        let args = field.arguments(&variables).unwrap();
        assert_eq!(args["a"], 1);
        assert_eq!(args["b"], "x");
        assert_eq!(args["c"], true);
    }

    #[test]
    fn missing_variable_is_reported() {
        let field = RootField::parse("{ person(id: $personId) { id } }").unwrap();
        let err = field.arguments(&Map::new()).unwrap_err();
        assert_eq!(err, "Variable 'personId' has not been set");
    }
}
