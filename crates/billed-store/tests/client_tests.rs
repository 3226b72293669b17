// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Result, anyhow};
use billed_app::{
    Bill, BillId, BillStatus, BillStore, CreateRequest, StoreError, UpdateRequest, fetch_bills,
};
use billed_store::Client;
use std::io::Read;
use std::thread;
use std::time::Duration;
use tiny_http::{Header, Method, Request, Response, Server};

fn json_response(body: &str, status: u16) -> Response<std::io::Cursor<Vec<u8>>> {
    Response::from_string(body)
        .with_status_code(status)
        .with_header(
            Header::from_bytes("Content-Type", "application/json")
                .expect("valid content type header"),
        )
}

fn header_value(request: &Request, name: &'static str) -> Option<String> {
    request
        .headers()
        .iter()
        .find(|header| header.field.equiv(name))
        .map(|header| header.value.as_str().to_owned())
}

fn start_server() -> Result<(Server, String)> {
    let server =
        Server::http("127.0.0.1:0").map_err(|error| anyhow!("start mock server: {error}"))?;
    let addr = format!("http://{}", server.server_addr());
    Ok((server, addr))
}

#[test]
fn unreachable_back_end_is_reported_with_remediation() -> Result<()> {
    let mut client = Client::new("http://127.0.0.1:1", Duration::from_millis(50))?;
    let error = client.list().expect_err("list should fail for unreachable endpoint");
    assert!(matches!(error, StoreError::Unreachable(_)));
    assert!(error.to_string().contains("api.base_url"));
    Ok(())
}

#[test]
fn list_sends_bearer_token_and_decodes_bills() -> Result<()> {
    let (server, addr) = start_server()?;
    let handle = thread::spawn(move || {
        let request = server.recv().expect("request expected");
        assert_eq!(request.method(), &Method::Get);
        assert_eq!(request.url(), "/bills");
        assert_eq!(
            header_value(&request, "Authorization").as_deref(),
            Some("Bearer token-123")
        );
        let body = r#"[{"id":"a1","status":"pending","email":"a@a","date":"2004-04-04","amount":400,"type":"Transports","name":"train"}]"#;
        request
            .respond(json_response(body, 200))
            .expect("response should succeed");
    });

    let mut client =
        Client::new(&addr, Duration::from_secs(1))?.with_token(Some("token-123".to_owned()));
    let bills = fetch_bills(&mut client)?;
    assert_eq!(bills.len(), 1);
    assert_eq!(bills[0].id, BillId::new("a1"));
    assert_eq!(bills[0].amount, Some(400.0));

    handle.join().expect("server thread should join");
    Ok(())
}

#[test]
fn list_failure_without_body_uses_status_message() -> Result<()> {
    let (server, addr) = start_server()?;
    let handle = thread::spawn(move || {
        let request = server.recv().expect("request expected");
        request
            .respond(Response::empty(404))
            .expect("response should succeed");
    });

    let mut client = Client::new(&addr, Duration::from_secs(1))?;
    let error = client.list().expect_err("list should fail");
    assert_eq!(error, StoreError::status(404));
    assert_eq!(error.to_string(), "Erreur 404");

    handle.join().expect("server thread should join");
    Ok(())
}

#[test]
fn update_patches_bill_by_id() -> Result<()> {
    let (server, addr) = start_server()?;
    let handle = thread::spawn(move || {
        let mut request = server.recv().expect("request expected");
        assert_eq!(request.method(), &Method::Patch);
        assert_eq!(request.url(), "/bills/47qAXb6fIm2zOKkLzMro");
        let mut body = String::new();
        request
            .as_reader()
            .read_to_string(&mut body)
            .expect("body should read");
        let parsed: serde_json::Value = serde_json::from_str(&body).expect("json body");
        assert_eq!(parsed["status"], "accepted");
        assert_eq!(parsed["commentAdmin"], "ok");
        request
            .respond(json_response(&body, 200))
            .expect("response should succeed");
    });

    let bill = Bill {
        id: BillId::new("47qAXb6fIm2zOKkLzMro"),
        email: "a@a".to_owned(),
        name: "encore".to_owned(),
        bill_type: "Hôtel et logement".to_owned(),
        amount: Some(400.0),
        date: "2004-04-04".to_owned(),
        status: BillStatus::Pending,
        comment_admin: None,
        file: None,
        vat: Some("80".to_owned()),
        pct: Some(20),
        commentary: None,
    }
    .reviewed(BillStatus::Accepted, "ok");

    let mut client = Client::new(&addr, Duration::from_secs(1))?;
    let record = client.update(&UpdateRequest::for_bill(&bill)?)?;
    assert_eq!(record.status.as_deref(), Some("accepted"));

    handle.join().expect("server thread should join");
    Ok(())
}

#[test]
fn create_uploads_multipart_receipt() -> Result<()> {
    let (server, addr) = start_server()?;
    let handle = thread::spawn(move || {
        let mut request = server.recv().expect("request expected");
        assert_eq!(request.method(), &Method::Post);
        assert_eq!(request.url(), "/bills");
        let content_type = header_value(&request, "Content-Type").unwrap_or_default();
        assert!(content_type.starts_with("multipart/form-data"));
        let mut body = Vec::new();
        request
            .as_reader()
            .read_to_end(&mut body)
            .expect("body should read");
        let body = String::from_utf8_lossy(&body);
        assert!(body.contains("filename=\"ticket.png\""));
        assert!(body.contains("employee@test.tld"));
        request
            .respond(json_response(
                r#"{"fileUrl":"https://localhost:3456/images/ticket.png","key":"1234"}"#,
                200,
            ))
            .expect("response should succeed");
    });

    let mut client = Client::new(&addr, Duration::from_secs(1))?;
    let created = client.create(&CreateRequest {
        file_name: "ticket.png".to_owned(),
        mime_type: "image/png".to_owned(),
        data: vec![0x89, 0x50, 0x4e, 0x47],
        email: "employee@test.tld".to_owned(),
    })?;
    assert_eq!(created.key, BillId::new("1234"));
    assert_eq!(created.file_url, "https://localhost:3456/images/ticket.png");

    handle.join().expect("server thread should join");
    Ok(())
}

#[test]
fn login_returns_token_and_surfaces_server_message() -> Result<()> {
    let (server, addr) = start_server()?;
    let handle = thread::spawn(move || {
        let mut request = server.recv().expect("request expected");
        assert_eq!(request.url(), "/auth/login");
        let mut body = String::new();
        request
            .as_reader()
            .read_to_string(&mut body)
            .expect("body should read");
        assert!(body.contains("\"email\":\"admin@test.tld\""));
        request
            .respond(json_response(r#"{"jwt":"signed"}"#, 200))
            .expect("response should succeed");

        let request = server.recv().expect("request expected");
        request
            .respond(json_response(r#"{"message":"invalid password"}"#, 401))
            .expect("response should succeed");
    });

    let client = Client::new(&addr, Duration::from_secs(1))?;
    assert_eq!(client.login("admin@test.tld", "admin")?, "signed");
    let error = client
        .login("admin@test.tld", "wrong")
        .expect_err("second login should fail");
    assert_eq!(error.to_string(), "invalid password");

    handle.join().expect("server thread should join");
    Ok(())
}
