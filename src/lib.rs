//! # oss-issues
//!
//! Ranks a Maven project's direct dependencies by how often its Java sources
//! import their classes, then attaches an open-issue snapshot from each
//! dependency's issue tracker.
//!
//! ## Architecture
//!
//! - **model**: Coordinates, dependencies and the parsed POM model
//! - **pom**: POM parsing with quick-xml and property interpolation
//! - **project**: Project and reactor loading from a top-level pom.xml
//! - **repository**: Local/remote Maven repository artifact resolution
//! - **catalog**: Class lists of resolved jars
//! - **imports**: Single-type import extraction with tree-sitter
//! - **usage**: Import-to-dependency attribution and ranking
//! - **lineage**: Parent POM chains of resolved artifacts
//! - **site**: Issue tracker discovery from a lineage
//! - **scrape**: Issue tracker scrapers (GitHub over HTTP, Jira via headless Chrome)
//! - **report**: Usage joined with issue snapshots, rendered as JSON or text
//! - **config** / **cli** / **logging**: Command-line surface and ambient setup

pub mod catalog;
pub mod cli;
pub mod config;
pub mod error;
pub mod imports;
pub mod lineage;
pub mod logging;
pub mod model;
pub mod pom;
pub mod project;
pub mod report;
pub mod repository;
pub mod scrape;
pub mod site;
pub mod usage;
