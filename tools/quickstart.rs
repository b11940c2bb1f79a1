//! Quickstart: build a two-person graph and print its value maps
//!
//! Connection settings come from `GRAPH_ENDPOINT`, `GRAPH_USERNAME`,
//! `GRAPH_PASSWORD` and `GRAPH_TRAVERSAL_SOURCE` (or a `.env` file).

use anyhow::Result;
use gremlin_graph_db::{init_logging, LoggingConfig, Session, SessionConfig, __};

fn main() -> Result<()> {
    init_logging(&LoggingConfig::from_env())?;

    let session = Session::open(SessionConfig::from_env())?;
    let g = session.g();

    g.add_v("person")
        .property("id", "1")
        .property("name", "Alice")
        .next()?;

    g.add_v("person")
        .property("id", "2")
        .property("name", "Bob")
        .next()?;

    g.v("1")
        .add_e("knows")
        .to(__::v("2"))
        .property("since", 2023)
        .next()?;

    let results = g.v(()).has_label("person").value_map(true).to_list()?;
    for result in &results {
        println!("{}", result);
    }

    session.close();
    Ok(())
}
