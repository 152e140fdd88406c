//! View command implementation.

use ledgerview_protocol::{Collection, Record};
use ledgerview_view::{FilterSpec, PagedView, SortScope, SortSpec};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;

/// Options for the view command.
#[derive(Debug, Clone)]
pub struct ViewOptions {
    /// Identifier field of the JSON records.
    pub id_field: String,
    /// Zero-based page index.
    pub page: usize,
    /// Records per page.
    pub page_size: usize,
    /// Field to filter on.
    pub field: Option<String>,
    /// Prefix to filter by.
    pub query: Option<String>,
    /// Field to sort by.
    pub sort: Option<String>,
    /// Sort descending.
    pub descending: bool,
    /// Sort scope (`filtered` or `page`).
    pub sort_scope: String,
}

/// One rendered page.
#[derive(Debug, Serialize)]
pub struct PageOutput {
    /// Page shown.
    pub page: usize,
    /// Records per page.
    pub page_size: usize,
    /// Pages in the filtered set.
    pub page_count: usize,
    /// Records in the file.
    pub total: usize,
    /// Records passing the filter.
    pub filtered: usize,
    /// Records on the page.
    pub records: Vec<Record>,
}

/// Runs the view command.
pub fn run(path: &Path, options: &ViewOptions, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let collection = super::load_collection(path, &options.id_field)?;
    let output = render(Arc::new(collection), options)?;

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&output)?),
        _ => print_text_output(&output),
    }

    Ok(())
}

/// Builds the page described by `options`.
pub fn render(
    collection: Arc<Collection>,
    options: &ViewOptions,
) -> Result<PageOutput, Box<dyn std::error::Error>> {
    let scope = match options.sort_scope.as_str() {
        "filtered" => SortScope::FilteredSet,
        "page" => SortScope::VisiblePage,
        other => return Err(format!("unknown sort scope `{other}` (filtered, page)").into()),
    };

    let mut view = PagedView::new(collection, options.page_size)?.with_sort_scope(scope);

    if let Some(query) = &options.query {
        let field = options
            .field
            .clone()
            .ok_or("--query needs --field")?;
        view.set_filter(FilterSpec::new(field, query.clone()));
    }
    if let Some(field) = &options.sort {
        view.set_sort(Some(if options.descending {
            SortSpec::descending(field.clone())
        } else {
            SortSpec::ascending(field.clone())
        }));
    }

    view.set_page_index(options.page);
    if view.clamp_page_index() {
        tracing::warn!(requested = options.page, shown = view.page_index(), "page past the end");
    }

    Ok(PageOutput {
        page: view.page_index(),
        page_size: view.page_size(),
        page_count: view.page_count(),
        total: view.total_count(),
        filtered: view.filtered_count(),
        records: view.visible_records().into_iter().cloned().collect(),
    })
}

fn print_text_output(output: &PageOutput) {
    println!(
        "Page {} of {} ({} of {} records match)",
        if output.page_count == 0 { 0 } else { output.page + 1 },
        output.page_count,
        output.filtered,
        output.total
    );
    println!();
    for record in &output.records {
        let fields: Vec<String> = record
            .fields()
            .map(|(name, value)| format!("{name}={}", value.stringify()))
            .collect();
        println!("  [{}] {}", record.id(), fields.join("  "));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn options() -> ViewOptions {
        ViewOptions {
            id_field: "id".into(),
            page: 0,
            page_size: 20,
            field: None,
            query: None,
            sort: None,
            descending: false,
            sort_scope: "filtered".into(),
        }
    }

    fn players(n: u64) -> Arc<Collection> {
        let names = ["LeBron James", "Lonzo Ball", "Zion Williamson"];
        Arc::new(Collection::from_records((0..n).map(|i| {
            Record::new(i)
                .with_field("player", names[(i % 3) as usize])
                .with_field("serial", 100 - i)
        })))
    }

    #[test]
    fn second_page_of_twenty_five() {
        let output = render(
            players(25),
            &ViewOptions {
                page: 1,
                ..options()
            },
        )
        .unwrap();
        assert_eq!(output.page_count, 2);
        assert_eq!(output.records.len(), 5);
    }

    #[test]
    fn filter_and_sort() {
        let output = render(
            players(9),
            &ViewOptions {
                field: Some("player".into()),
                query: Some("l".into()),
                sort: Some("serial".into()),
                ..options()
            },
        )
        .unwrap();
        assert_eq!(output.filtered, 6);
        // ascending serial puts the highest id first
        assert_eq!(output.records[0].id().as_str(), "7");
    }

    #[test]
    fn page_past_end_is_clamped() {
        let output = render(
            players(25),
            &ViewOptions {
                page: 9,
                ..options()
            },
        )
        .unwrap();
        assert_eq!(output.page, 1);
    }

    #[test]
    fn bad_options_rejected() {
        let bad_scope = ViewOptions {
            sort_scope: "everything".into(),
            ..options()
        };
        assert!(render(players(3), &bad_scope).is_err());

        let query_without_field = ViewOptions {
            query: Some("x".into()),
            ..options()
        };
        assert!(render(players(3), &query_without_field).is_err());

        let zero_page = ViewOptions {
            page_size: 0,
            ..options()
        };
        assert!(render(players(3), &zero_page).is_err());
    }

    #[test]
    fn loads_json_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"[{{"id": 1, "play": {{"FullName": "Ja Morant"}}}}, {{"id": 2}}]"#).unwrap();

        let collection = super::super::load_collection(file.path(), "id").unwrap();
        assert_eq!(collection.len(), 2);
        assert!(run(file.path(), &options(), "json").is_ok());
    }
}
