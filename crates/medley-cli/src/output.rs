//! JSON output formatting

use medley_core::RankedMatch;
use serde::Serialize;

#[derive(Serialize)]
struct MatchOutput<'a> {
    query: &'a str,
    matches: usize,
    results: &'a [RankedMatch],
}

/// Render ranked matches for one query
pub fn render_json_results(query: &str, results: &[RankedMatch]) -> serde_json::Result<String> {
    let output = MatchOutput {
        query,
        matches: results.len(),
        results,
    };
    serde_json::to_string_pretty(&output)
}

/// Print ranked matches for one query as JSON
pub fn print_json_results(query: &str, results: &[RankedMatch]) {
    match render_json_results(query, results) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Error serializing results: {}", e),
    }
}
