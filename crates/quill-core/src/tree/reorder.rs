use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::Path;

use tracing::{info, warn};
use uuid::Uuid;

use super::load::{fallback_titles, read_page_file};
use super::marker::{self, TitleTriple};
use super::naming::{DEFAULT_ORDER, entry_name, format_order, order_prefix, strip_order};
use super::{ContentTree, NodeKind, TreeError, join_rel, list_entries};

/// One entry being moved by a reorder.
struct Move {
    original: String,
    staging: String,
    target: String,
}

impl ContentTree {
    /// Give an entry a new title, keeping its order prefix.
    ///
    /// The entry is renamed to `{prefix}-{slug(new_title)}` and the title
    /// markers of every page at or below it are rewritten to carry the new
    /// title. Pages without a marker get one. Returns the entry's new
    /// root-relative path.
    pub fn rename(&self, kind: NodeKind, rel: &str, new_title: &str) -> Result<String, TreeError> {
        let _guard = self.lock();
        let old_path = self.existing(kind, rel)?;
        let parent = old_path
            .parent()
            .ok_or_else(|| TreeError::InvalidPath(rel.to_string()))?
            .to_path_buf();
        let old_name = file_name(&old_path)?;

        let prefix = order_prefix(&old_name).unwrap_or(DEFAULT_ORDER);
        let new_name = entry_name(prefix, new_title, kind.is_file());
        let new_path = parent.join(&new_name);

        if new_name != old_name {
            if new_path.exists() {
                return Err(TreeError::Collision(new_path));
            }
            fs::rename(&old_path, &new_path).map_err(TreeError::io(format!(
                "failed to rename {} to {}",
                old_path.display(),
                new_path.display()
            )))?;
        }

        let mut new_parts: Vec<&str> = rel
            .split('/')
            .filter(|p| !p.is_empty() && *p != ".")
            .collect();
        if let Some(last) = new_parts.last_mut() {
            *last = new_name.as_str();
        }
        let new_rel = join_rel(&new_parts);

        let retitled = self.retitle_below(kind, &new_parts, new_title)?;
        info!(
            kind = %kind,
            from = rel,
            to = %new_rel,
            pages_retitled = retitled,
            "renamed"
        );
        Ok(new_rel)
    }

    /// Renumber the `kind` children of `parent` (`""` for modules) so that
    /// `ordered[i]` gets order prefix `i + 1`.
    ///
    /// Every listed name must be an existing sibling, listed once. Siblings
    /// not listed keep their names; a computed target that would land on one
    /// of them is a [`TreeError::Collision`]. Entries are first moved to
    /// hidden staging names, then to their targets, so targets never clash
    /// with names still in use. On failure, completed moves are undone.
    /// Returns the new names in order.
    pub fn reorder(
        &self,
        kind: NodeKind,
        parent: &str,
        ordered: &[String],
    ) -> Result<Vec<String>, TreeError> {
        let _guard = self.lock();
        let dir = self.resolve_parent(kind, parent)?;
        if !dir.is_dir() {
            return Err(match parent_kind(kind) {
                Some(parent_kind) => TreeError::NotFound {
                    kind: parent_kind,
                    path: dir,
                },
                None => TreeError::RootMissing(dir),
            });
        }

        let siblings = list_entries(&dir, kind)?;
        let mut seen = HashSet::new();
        for name in ordered {
            if !seen.insert(name.as_str()) {
                return Err(TreeError::DuplicateName(name.clone()));
            }
            if !siblings.contains(name) {
                return Err(TreeError::NotFound {
                    kind,
                    path: dir.join(name),
                });
            }
        }

        let token = Uuid::new_v4().simple().to_string();
        let targets: Vec<String> = ordered
            .iter()
            .enumerate()
            .map(|(i, name)| format!("{}-{}", format_order(i as u32 + 1), strip_order(name)))
            .collect();

        for target in &targets {
            if siblings.contains(target) && !seen.contains(target.as_str()) {
                return Err(TreeError::Collision(dir.join(target)));
            }
        }

        let moves: Vec<Move> = ordered
            .iter()
            .zip(&targets)
            .enumerate()
            .filter(|(_, (name, target))| name != target)
            .map(|(i, (name, target))| Move {
                original: name.clone(),
                staging: format!(".reorder-{token}-{i}"),
                target: target.clone(),
            })
            .collect();

        apply_moves(&dir, &moves)?;

        info!(
            kind = %kind,
            parent = %dir.display(),
            entries = ordered.len(),
            moved = moves.len(),
            "reordered"
        );
        Ok(targets)
    }

    /// Rewrite markers for every page under a renamed entry.
    fn retitle_below(
        &self,
        kind: NodeKind,
        parts: &[&str],
        new_title: &str,
    ) -> Result<usize, TreeError> {
        let update = |titles: &mut TitleTriple| match kind {
            NodeKind::Module => titles.module = new_title.to_string(),
            NodeKind::Chapter => titles.chapter = new_title.to_string(),
            NodeKind::Page => titles.page = new_title.to_string(),
        };

        let mut pages: Vec<[String; 3]> = Vec::new();
        match parts {
            [module] => {
                let module_path = self.root.join(module);
                for chapter in list_entries(&module_path, NodeKind::Chapter)? {
                    for page in list_entries(&module_path.join(&chapter), NodeKind::Page)? {
                        pages.push([module.to_string(), chapter.clone(), page]);
                    }
                }
            }
            [module, chapter] => {
                let chapter_path = self.root.join(module).join(chapter);
                for page in list_entries(&chapter_path, NodeKind::Page)? {
                    pages.push([module.to_string(), chapter.to_string(), page]);
                }
            }
            [module, chapter, page] => {
                pages.push([module.to_string(), chapter.to_string(), page.to_string()]);
            }
            _ => return Err(TreeError::InvalidPath(parts.join("/"))),
        }

        for [module, chapter, page] in &pages {
            let path = self.root.join(module).join(chapter).join(page);
            let raw = read_page_file(&path)?;
            let (mut titles, body) = marker::split(&raw, &fallback_titles(module, chapter, page));
            update(&mut titles);
            fs::write(&path, marker::with_marker(&titles, body)).map_err(TreeError::io(
                format!("failed to update title marker in {}", path.display()),
            ))?;
        }
        Ok(pages.len())
    }
}

fn parent_kind(kind: NodeKind) -> Option<NodeKind> {
    match kind {
        NodeKind::Module => None,
        NodeKind::Chapter => Some(NodeKind::Module),
        NodeKind::Page => Some(NodeKind::Chapter),
    }
}

fn file_name(path: &Path) -> Result<String, TreeError> {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(str::to_string)
        .ok_or_else(|| TreeError::InvalidPath(path.display().to_string()))
}

/// Two-phase rename: originals to staging names, then staging to targets.
fn apply_moves(dir: &Path, moves: &[Move]) -> Result<(), TreeError> {
    for (i, m) in moves.iter().enumerate() {
        if let Err(source) = fs::rename(dir.join(&m.original), dir.join(&m.staging)) {
            return Err(roll_back(dir, &[], &moves[..i], source));
        }
    }
    for (i, m) in moves.iter().enumerate() {
        if let Err(source) = fs::rename(dir.join(&m.staging), dir.join(&m.target)) {
            return Err(roll_back(dir, &moves[..i], moves, source));
        }
    }
    Ok(())
}

/// Undo a partial reorder. `finished` entries sit at their targets and
/// `staged` entries (a superset of `finished`) were parked under staging
/// names. Finished entries go back to staging first so that restoring
/// originals cannot collide with a target.
fn roll_back(dir: &Path, finished: &[Move], staged: &[Move], source: io::Error) -> TreeError {
    let mut stranded = Vec::new();
    let mut restorable: HashSet<&str> = staged.iter().map(|m| m.staging.as_str()).collect();

    for m in finished {
        if let Err(e) = fs::rename(dir.join(&m.target), dir.join(&m.staging)) {
            warn!(entry = %m.target, error = %e, "could not undo reorder move");
            restorable.remove(m.staging.as_str());
            stranded.push(m.target.clone());
        }
    }
    for m in staged {
        if !restorable.contains(m.staging.as_str()) {
            continue;
        }
        if let Err(e) = fs::rename(dir.join(&m.staging), dir.join(&m.original)) {
            warn!(entry = %m.staging, error = %e, "could not restore entry after failed reorder");
            stranded.push(m.staging.clone());
        }
    }

    if stranded.is_empty() {
        TreeError::Io {
            message: format!("reorder in {} failed and was rolled back", dir.display()),
            source,
        }
    } else {
        TreeError::ReorderIncomplete { stranded, source }
    }
}
