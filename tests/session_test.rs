/// Session and script integration tests
///
/// Drives the engine the way an application would: open a session, submit
/// script text, use the traversal source, dump and reload the graph, close.

use gremlin_graph_db::{
    export_to_json, import_from_json, parse_gremlin, ExecutionError, ExportOptions,
    ImportOptions, Session, SessionConfig, SessionError, Terminal, Value,
};
use serde_json::json;
use tempfile::TempDir;

const ALICE_AND_BOB: [&str; 3] = [
    "g.addV('person').property('id', '1').property('name', 'Alice').next()",
    "g.addV('person').property('id', '2').property('name', 'Bob').next()",
    "g.V('1').addE('knows').to(g.V('2')).property('since', 2023).next()",
];

fn json_results(values: &[Value]) -> Vec<serde_json::Value> {
    values.iter().map(Value::to_json).collect()
}

#[test]
fn test_quickstart_script() {
    let session = Session::open(SessionConfig::memory("quickstart")).unwrap();
    for script in ALICE_AND_BOB {
        assert_eq!(session.submit(script).unwrap().len(), 1);
    }

    let results = session
        .submit("g.V().hasLabel('person').valueMap(True).toList()")
        .unwrap();
    assert_eq!(
        json_results(&results),
        vec![
            json!({"id": "1", "label": "person", "name": ["Alice"]}),
            json!({"id": "2", "label": "person", "name": ["Bob"]}),
        ]
    );

    session.close();
    session.close();
    assert!(!session.is_open());
}

#[test]
fn test_script_and_builder_agree() {
    let session = Session::open(SessionConfig::memory("agree")).unwrap();
    for script in ALICE_AND_BOB {
        session.submit(script).unwrap();
    }

    let script = parse_gremlin("g.V('1').outE('knows').valueMap(true, 'since')").unwrap();
    assert_eq!(script.terminal, Terminal::ToList);

    let from_script = script.traversal.with_source(session.g()).to_list().unwrap();
    let from_builder = session
        .g()
        .v("1")
        .out_e("knows")
        .value_map_keys(true, "since")
        .to_list()
        .unwrap();

    assert_eq!(from_script, from_builder);
    assert_eq!(
        from_script[0].as_map().unwrap()["since"],
        Value::Integer(2023)
    );
}

#[test]
fn test_duplicate_edge_id_through_scripts() {
    let session = Session::open(SessionConfig::memory("dup")).unwrap();
    for script in &ALICE_AND_BOB[..2] {
        session.submit(script).unwrap();
    }

    let add = "g.V('1').addE('knows').to(__.V('2')).property(T.id, 'e1').next()";
    session.submit(add).unwrap();

    match session.submit(add) {
        Err(SessionError::Execution(ExecutionError::DuplicateId(id))) => assert_eq!(id, "e1"),
        other => panic!("expected DuplicateId, got {:?}", other),
    }
}

#[test]
fn test_next_on_empty_result() {
    let session = Session::open(SessionConfig::memory("empty")).unwrap();

    assert!(matches!(
        session.submit("g.V().hasLabel('nobody').next()"),
        Err(SessionError::Execution(ExecutionError::NoSuchElement))
    ));
    assert!(session.submit("g.V().hasLabel('nobody')").unwrap().is_empty());
}

#[test]
fn test_parse_errors_surface() {
    let session = Session::open(SessionConfig::memory("parse")).unwrap();

    assert!(matches!(
        session.submit("g.V(").unwrap_err(),
        SessionError::Parse(_)
    ));
    assert!(matches!(
        session.submit("g.V().both_ways()").unwrap_err(),
        SessionError::Parse(_)
    ));
}

#[test]
fn test_sessions_on_shared_store() {
    let writer = Session::open(SessionConfig::memory("shared")).unwrap();
    let reader =
        Session::open_with_storage(SessionConfig::memory("shared"), writer.storage().clone())
            .unwrap();

    for script in ALICE_AND_BOB {
        writer.submit(script).unwrap();
    }
    drop(writer);

    let names = reader
        .submit("g.V('2').in('knows').values('name')")
        .unwrap();
    assert_eq!(names, vec![Value::from("Alice")]);
}

#[test]
fn test_dump_and_reload() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("graph.json");

    let original = Session::open(SessionConfig::memory("original")).unwrap();
    for script in ALICE_AND_BOB {
        original.submit(script).unwrap();
    }
    export_to_json(original.storage(), &path, &ExportOptions::default()).unwrap();

    let restored = Session::open(SessionConfig::memory("restored")).unwrap();
    let stats = import_from_json(restored.storage(), &path, &ImportOptions::default()).unwrap();
    assert_eq!((stats.vertices_imported, stats.edges_imported), (2, 1));

    let query = "g.V().hasLabel('person').valueMap(true)";
    assert_eq!(
        original.submit(query).unwrap(),
        restored.submit(query).unwrap()
    );
    assert_eq!(
        json_results(&restored.submit("g.E().values('since')").unwrap()),
        vec![json!(2023)]
    );
}
