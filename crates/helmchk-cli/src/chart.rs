use std::path::Path;

use helmchk_template::{SourceKind, TemplateSet};
use vfs::VfsPath;

use crate::error::CliResult;

const TEMPLATE_EXTENSIONS: [&str; 4] = ["yaml", "yml", "tpl", "txt"];

/// Every template file below `templates_dir`, sorted by path.
///
/// `tests/` directly below `templates_dir` holds Helm test hooks and is
/// skipped unless `include_tests` is set.
pub fn list_template_files(templates_dir: &VfsPath, include_tests: bool) -> CliResult<Vec<VfsPath>> {
    let mut out = Vec::new();
    list_templates_recursive(templates_dir, templates_dir, include_tests, &mut out)?;

    out.retain(|p| {
        let file_name = p.filename();
        let ext = Path::new(&file_name).extension().and_then(|e| e.to_str());
        ext.is_some_and(|e| TEMPLATE_EXTENSIONS.iter().any(|known| e.eq_ignore_ascii_case(known)))
    });

    out.sort_by(|a, b| a.as_str().cmp(b.as_str()));
    out.dedup_by(|a, b| a.as_str() == b.as_str());
    Ok(out)
}

fn list_templates_recursive(
    root: &VfsPath,
    dir: &VfsPath,
    include_tests: bool,
    out: &mut Vec<VfsPath>,
) -> CliResult<()> {
    for ent in dir.read_dir()? {
        if ent.is_dir()? {
            if !include_tests && dir == root && ent.filename().eq_ignore_ascii_case("tests") {
                tracing::debug!(dir = ent.as_str(), "skipping chart tests");
                continue;
            }
            list_templates_recursive(root, &ent, include_tests, out)?;
        } else if ent.is_file()? {
            out.push(ent);
        }
    }

    Ok(())
}

/// Name of a template file as Helm reports it, relative to the chart.
fn unit_name(chart_dir: &VfsPath, file: &VfsPath) -> String {
    let root = chart_dir.as_str().trim_end_matches('/');
    file.as_str()
        .strip_prefix(root)
        .map(|rel| rel.trim_start_matches('/'))
        .unwrap_or(file.as_str())
        .to_string()
}

/// Parse every template file into one set. Files starting with `_` are
/// partials: Helm does not render them, they only contribute defines.
pub fn load_template_set(
    chart_dir: &VfsPath,
    templates_dir: &VfsPath,
    include_tests: bool,
) -> CliResult<TemplateSet> {
    let mut set = TemplateSet::new();
    for file in list_template_files(templates_dir, include_tests)? {
        let kind = if file.filename().starts_with('_') {
            SourceKind::Partial
        } else {
            SourceKind::Entry
        };
        let name = unit_name(chart_dir, &file);
        let src = file.read_to_string()?;
        tracing::debug!(template = %name, ?kind, "parsing template");
        set.add_source(&name, &src, kind)?;
    }
    Ok(set)
}
