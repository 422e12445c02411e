mod support;

use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;

use pkgsearch_core::config::Config;
use pkgsearch_core::contract::{
    ActivateRequest, CoreRequest, CoreResponse, InitialSearchRequest, ResolveMetasRequest,
};
use pkgsearch_core::core_service::CoreService;
use pkgsearch_core::icon_store::IconStore;
use pkgsearch_core::model::PackageRow;
use pkgsearch_core::opener::UrlOpener;
use pkgsearch_core::runtime::serve;
use pkgsearch_core::term_cache::TermCache;
use pkgsearch_core::transport::{handle_json, handle_request, ErrorCode, TransportResponse};
use support::{
    FailingOpener, FakeClock, FakeFetcher, FakeSource, RecordingOpener, StaticSettings, NOW,
};

fn service(root: &Path) -> CoreService {
    service_with_opener(root, Arc::new(RecordingOpener::default()))
}

fn service_with_opener(root: &Path, opener: Arc<dyn UrlOpener>) -> CoreService {
    let config = Config {
        cache_root: root.to_path_buf(),
        ..Config::default()
    };
    let terms = TermCache::with_clock(
        config.search_dir(),
        config.expiry_secs,
        FakeSource::with(" gimp", vec![PackageRow::new("gimp", "g1")]),
        FakeClock::at(NOW),
    );
    let icons = IconStore::open(&config, FakeFetcher::new()).unwrap();
    CoreService::with_parts(
        config,
        StaticSettings::enabled("pkg"),
        terms,
        icons,
        opener,
    )
    .unwrap()
}

#[test]
fn request_handler_returns_result_set() {
    let dir = tempfile::tempdir().unwrap();
    let service = service(dir.path());

    let response = handle_request(
        &service,
        CoreRequest::InitialSearch(InitialSearchRequest {
            terms: vec!["pkg".into(), "gimp".into()],
        }),
    );

    match response {
        TransportResponse::Ok {
            response: CoreResponse::ResultSet(set),
        } => assert_eq!(set.ids, vec!["gimp:g1".to_string()]),
        other => panic!("expected result set, got {other:?}"),
    }
}

#[test]
fn metas_response_carries_icon_path() {
    let dir = tempfile::tempdir().unwrap();
    let service = service(dir.path());

    let request = CoreRequest::ResolveMetas(ResolveMetasRequest {
        ids: vec!["gimp:g1".into()],
    });
    let raw = handle_json(&service, &serde_json::to_string(&request).unwrap());
    let parsed: TransportResponse = serde_json::from_str(&raw).unwrap();

    match parsed {
        TransportResponse::Ok {
            response: CoreResponse::Metas(metas),
        } => {
            assert_eq!(metas.metas[0].name, "gimp");
            assert!(metas.metas[0].icon_path.as_deref().unwrap().ends_with("g1.png"));
        }
        other => panic!("expected metas, got {other:?}"),
    }
}

#[test]
fn wire_format_uses_snake_case_kinds() {
    let encoded = serde_json::to_string(&CoreRequest::Activate(ActivateRequest {
        id: "gimp:g1".into(),
    }))
    .unwrap();
    assert_eq!(encoded, r#"{"kind":"activate","payload":{"id":"gimp:g1"}}"#);
}

#[test]
fn json_handler_returns_invalid_json_error_code() {
    let dir = tempfile::tempdir().unwrap();
    let service = service(dir.path());

    let raw = handle_json(&service, "{not-json");
    let parsed: TransportResponse = serde_json::from_str(&raw).unwrap();

    match parsed {
        TransportResponse::Err { error } => assert_eq!(error.code, ErrorCode::InvalidJson),
        _ => panic!("expected invalid json error"),
    }
}

#[test]
fn json_handler_returns_invalid_result_id_error_code() {
    let dir = tempfile::tempdir().unwrap();
    let service = service(dir.path());

    let raw = handle_json(&service, r#"{"kind":"activate","payload":{"id":"nocolon"}}"#);
    let parsed: TransportResponse = serde_json::from_str(&raw).unwrap();

    match parsed {
        TransportResponse::Err { error } => assert_eq!(error.code, ErrorCode::InvalidResultId),
        _ => panic!("expected invalid result id error"),
    }
}

fn error_code(service: &CoreService, payload: &str) -> ErrorCode {
    let parsed: TransportResponse = serde_json::from_str(&handle_json(service, payload)).unwrap();
    match parsed {
        TransportResponse::Err { error } => error.code,
        other => panic!("expected an error, got {other:?}"),
    }
}

#[test]
fn blank_activate_id_is_an_invalid_request() {
    let dir = tempfile::tempdir().unwrap();
    let service = service(dir.path());

    let code = error_code(&service, r#"{"kind":"activate","payload":{"id":"  "}}"#);
    assert_eq!(code, ErrorCode::InvalidRequest);
}

#[test]
fn opener_failure_maps_to_open_error_code() {
    let dir = tempfile::tempdir().unwrap();
    let service = service_with_opener(dir.path(), Arc::new(FailingOpener));

    let code = error_code(&service, r#"{"kind":"activate","payload":{"id":"gimp:g1"}}"#);
    assert_eq!(code, ErrorCode::Open);
}

#[test]
fn serve_loop_answers_one_line_per_request() {
    let dir = tempfile::tempdir().unwrap();
    let service = service(dir.path());
    let input = concat!(
        r#"{"kind":"initial_search","payload":{"terms":["pkg","gimp"]}}"#,
        "\n\n",
        r#"{"kind":"sub_search","payload":{"previous":["gimp:g1"],"terms":["nope"]}}"#,
        "\n",
        "garbage\n",
    );
    let mut out = Vec::new();

    let handled = serve(&service, Cursor::new(input), &mut out).unwrap();

    assert_eq!(handled, 3);
    let lines: Vec<TransportResponse> = String::from_utf8(out)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(lines.len(), 3);
    assert!(matches!(
        &lines[0],
        TransportResponse::Ok { response: CoreResponse::ResultSet(set) } if set.ids == vec!["gimp:g1".to_string()]
    ));
    assert!(matches!(
        &lines[1],
        TransportResponse::Ok { response: CoreResponse::ResultSet(set) } if set.ids.is_empty()
    ));
    assert!(matches!(&lines[2], TransportResponse::Err { .. }));
}
