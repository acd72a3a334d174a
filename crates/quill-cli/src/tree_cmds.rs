//! CLI handlers for `quill tree` subcommands.
//!
//! Paths are relative to the content root: `module`, `module/chapter` or
//! `module/chapter/page.md`.

use anyhow::{Context, Result};
use serde::Serialize;

use quill_core::ContentTree;
use quill_core::splice::process_page;
use quill_core::tree::{NodeKind, PageRef};

use crate::TreeCommands;
use crate::config::QuillConfig;
use crate::document_cmds::{generator, load_memory};
use crate::{print_json, read_input};

// -----------------------------------------------------------------------
// Public entry point
// -----------------------------------------------------------------------

/// Dispatch a `TreeCommands` variant to the appropriate handler.
pub async fn run_tree_command(command: TreeCommands, config: &QuillConfig) -> Result<()> {
    let tree = ContentTree::new(&config.content_dir);

    match command {
        TreeCommands::Show => cmd_show(&tree),
        TreeCommands::Get { page } => cmd_get(&tree, &page),
        TreeCommands::Put { page, file } => cmd_put(&tree, &page, file.as_deref()),
        TreeCommands::Process {
            page,
            index,
            context_file,
            memory,
        } => cmd_process(&tree, config, &page, index, context_file.as_deref(), &memory).await,
        TreeCommands::CreateModule { title } => {
            let id = tree
                .create_module(&title)
                .with_context(|| format!("failed to create module {title:?}"))?;
            print_json(&Created { id })
        }
        TreeCommands::CreateChapter { module, title } => {
            let chapter = tree
                .create_chapter(&module, &title)
                .with_context(|| format!("failed to create chapter {title:?} in {module}"))?;
            print_json(&Created {
                id: format!("{module}/{chapter}"),
            })
        }
        TreeCommands::CreatePage {
            module,
            chapter,
            title,
            file,
        } => {
            let content = match file {
                Some(path) => read_input(Some(&path))?,
                None => String::new(),
            };
            let page = tree
                .create_page(&module, &chapter, &title, &content)
                .with_context(|| format!("failed to create page {title:?} in {module}/{chapter}"))?;
            print_json(&Created {
                id: page.rel_path(),
            })
        }
        TreeCommands::Rename { kind, path, title } => {
            let kind = parse_kind(&kind)?;
            let id = tree
                .rename(kind, &path, &title)
                .with_context(|| format!("failed to rename {kind} {path}"))?;
            print_json(&Created { id })
        }
        TreeCommands::Reorder {
            kind,
            parent,
            names,
        } => {
            let kind = parse_kind(&kind)?;
            let names = tree
                .reorder(kind, &parent, &names)
                .with_context(|| format!("failed to reorder {kind} entries under {parent:?}"))?;
            print_json(&Reordered { names })
        }
        TreeCommands::Delete { kind, path } => {
            let kind = parse_kind(&kind)?;
            tree.delete(kind, &path)
                .with_context(|| format!("failed to delete {kind} {path}"))?;
            print_json(&Deleted { path })
        }
        TreeCommands::Import { file, clear } => {
            let document = read_input(Some(&file))?;
            let report = tree
                .import_flat(&document, clear)
                .with_context(|| format!("failed to import {file}"))?;
            print_json(&report)
        }
        TreeCommands::Export { output } => cmd_export(&tree, output.as_deref()),
    }
}

#[derive(Serialize)]
struct Created {
    id: String,
}

#[derive(Serialize)]
struct Reordered {
    names: Vec<String>,
}

#[derive(Serialize)]
struct Deleted {
    path: String,
}

fn parse_kind(raw: &str) -> Result<NodeKind> {
    raw.parse::<NodeKind>().map_err(anyhow::Error::msg)
}

// -----------------------------------------------------------------------
// quill tree show / get / put
// -----------------------------------------------------------------------

fn cmd_show(tree: &ContentTree) -> Result<()> {
    let modules = tree.load().context("failed to load content tree")?;
    print_json(&modules)
}

fn cmd_get(tree: &ContentTree, page: &str) -> Result<()> {
    let page_ref = PageRef::parse(page)?;
    let view = tree
        .get_page(&page_ref)
        .with_context(|| format!("failed to read page {page}"))?;
    print_json(&view)
}

#[derive(Serialize)]
struct Saved<'a> {
    page: &'a str,
    segment_count: usize,
}

fn cmd_put(tree: &ContentTree, page: &str, file: Option<&str>) -> Result<()> {
    let page_ref = PageRef::parse(page)?;
    let content = read_input(file)?;
    let segment_count = tree
        .put_page(&page_ref, &content)
        .with_context(|| format!("failed to save page {page}"))?;
    print_json(&Saved {
        page,
        segment_count,
    })
}

// -----------------------------------------------------------------------
// quill tree process <page>
// -----------------------------------------------------------------------

#[derive(Serialize)]
struct PageProcessed<'a> {
    page: &'a str,
    processed: usize,
}

async fn cmd_process(
    tree: &ContentTree,
    config: &QuillConfig,
    page: &str,
    index: Option<usize>,
    context_file: Option<&str>,
    selected: &[String],
) -> Result<()> {
    let page_ref = PageRef::parse(page)?;
    let context = match context_file {
        Some(path) => Some(read_input(Some(path))?),
        None => None,
    };
    let memory = load_memory(config, selected)?;

    let outcome = process_page(
        tree,
        &page_ref,
        index,
        context.as_deref(),
        &generator(config),
        &memory,
    )
    .await
    .with_context(|| format!("failed to process page {page}"))?;

    print_json(&PageProcessed {
        page,
        processed: outcome.processed,
    })
}

// -----------------------------------------------------------------------
// quill tree export
// -----------------------------------------------------------------------

fn cmd_export(tree: &ContentTree, output: Option<&str>) -> Result<()> {
    let flat = tree.export_flat().context("failed to export content tree")?;
    match output {
        Some(path) => {
            std::fs::write(path, &flat).with_context(|| format!("failed to write {path}"))?;
            eprintln!("Exported to {path}");
        }
        None => print!("{flat}"),
    }
    Ok(())
}
