//! Jupyter notebook (nbformat 4.5) output

use serde_json::{json, Value};
use uuid::Uuid;

use crate::application::script::{render_cells, Cell, CellKind, Target};
use crate::domain::Flow;

/// Split a cell source into notebook lines (each but the last keeps its `\n`).
fn source_lines(source: &str) -> Vec<String> {
    let source = source.trim_end();
    let mut lines: Vec<String> = source.split('\n').map(|l| format!("{l}\n")).collect();
    if let Some(last) = lines.last_mut() {
        last.pop();
    }
    lines
}

fn cell_json(cell: &Cell) -> Value {
    let id = Uuid::new_v4().simple().to_string();
    match cell.kind {
        CellKind::Markdown => json!({
            "cell_type": "markdown",
            "id": id,
            "metadata": {},
            "source": source_lines(&cell.source),
        }),
        CellKind::Code => json!({
            "cell_type": "code",
            "execution_count": null,
            "id": id,
            "metadata": {},
            "outputs": [],
            "source": source_lines(&cell.source),
        }),
    }
}

/// Build the notebook document for a flow.
///
/// The first code cell installs the requirements; the remaining cells are
/// the same cells the script is made of.
pub fn to_notebook(flow: &Flow, requirements: &[String]) -> Value {
    let install = if requirements.is_empty() {
        None
    } else {
        let quoted: Vec<String> = requirements.iter().map(|r| format!("\"{r}\"")).collect();
        Some(Cell::code(format!(
            "import sys  # noqa\n\n!{{sys.executable}} -m pip install -q {}",
            quoted.join(" ")
        )))
    };

    let mut cells = render_cells(flow, requirements, Target::Notebook);
    if let Some(install) = install {
        // after the title and the docstring
        let at = cells.len().min(2);
        cells.insert(at, Cell::markdown("## Installation"));
        cells.insert(at + 1, install);
    }

    json!({
        "cells": cells.iter().map(cell_json).collect::<Vec<_>>(),
        "metadata": {
            "kernelspec": {
                "display_name": "Python 3",
                "language": "python",
                "name": "python3",
            },
            "language_info": {
                "name": "python",
            },
        },
        "nbformat": 4,
        "nbformat_minor": 5,
    })
}

/// Notebook document as pretty-printed JSON.
pub fn render_notebook(flow: &Flow, requirements: &[String]) -> Result<String, serde_json::Error> {
    let mut text = serde_json::to_string_pretty(&to_notebook(flow, requirements))?;
    text.push('\n');
    Ok(text)
}
