#![allow(dead_code)]
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use brainrot::ast::Program;
use brainrot::pipeline;
use test_support::load_cases;

#[derive(Clone)]
pub struct Workload {
    pub name: String,
    pub tags: Vec<String>,
    pub path: PathBuf,
}

/// Fixture programs opted into benchmarking.
pub fn workloads() -> Vec<Workload> {
    load_cases(Path::new("tests/programs"))
        .unwrap_or_else(|err| panic!("load cases: {err:#}"))
        .into_iter()
        .filter(|case| case.spec.bench.enabled)
        .map(|case| Workload {
            name: case.name,
            tags: case.spec.bench.tags,
            path: case.program_path,
        })
        .collect()
}

/// Workloads keyed by bench tag. A workload appears under each of its tags.
pub fn workloads_by_tag() -> BTreeMap<String, Vec<Workload>> {
    let mut grouped: BTreeMap<String, Vec<Workload>> = BTreeMap::new();
    for workload in workloads() {
        for tag in &workload.tags {
            grouped.entry(tag.clone()).or_default().push(workload.clone());
        }
    }
    grouped
}

pub fn load_source(path: &Path) -> String {
    fs::read_to_string(path).unwrap_or_else(|err| panic!("read {}: {err}", path.display()))
}

pub fn load_program(path: &Path) -> Program {
    let source = load_source(path);
    pipeline::parse_source(&source).unwrap_or_else(|err| panic!("parse {}: {err}", path.display()))
}
