#![forbid(unsafe_code)]

use orgtree_core::ids::NodeId;
use orgtree_core::{ChildrenQuery, MoveTarget, Placement};
use std::path::PathBuf;

pub(crate) const DEFAULT_PATH_FIELD: &str = "name";
pub(crate) const DEFAULT_SEPARATOR: &str = "/";

#[derive(Clone, Debug, PartialEq)]
pub(crate) struct Invocation {
    pub db: PathBuf,
    pub config: PathBuf,
    pub command: Command,
}

#[derive(Clone, Debug, PartialEq)]
pub(crate) enum Command {
    Init,
    Insert {
        content: String,
        placement: Placement,
    },
    Update {
        id: NodeId,
        content: String,
    },
    Move {
        ids: Vec<NodeId>,
        target: MoveTarget,
    },
    Delete {
        id: NodeId,
    },
    Get {
        id: NodeId,
    },
    Path {
        id: NodeId,
        field: Option<String>,
        separator: String,
    },
    Depth {
        id: NodeId,
    },
    Children {
        ids: Vec<NodeId>,
        query: ChildrenQuery,
    },
    Siblings {
        id: NodeId,
    },
    Resolve {
        path: String,
        start: Option<NodeId>,
        field: String,
        separator: String,
    },
    Subtree {
        id: NodeId,
        max_depth: Option<usize>,
    },
    Verify,
}

#[derive(Debug, Default)]
struct Flags {
    content: Option<String>,
    parent: Option<NodeId>,
    after: Option<NodeId>,
    levels: Option<usize>,
    first: bool,
    field: Option<String>,
    separator: Option<String>,
    start: Option<NodeId>,
    depth: Option<usize>,
}

/// `db` and `config` are the environment defaults; flags override them.
pub(crate) fn parse_args(
    args: &[String],
    mut db: Option<PathBuf>,
    mut config: Option<PathBuf>,
) -> Result<Invocation, String> {
    let mut flags = Flags::default();
    let mut positional = Vec::new();

    let mut i = 0usize;
    while i < args.len() {
        let a = args[i].as_str();
        match a {
            "--db" => {
                i += 1;
                let v = args.get(i).ok_or("--db requires PATH")?;
                db = Some(PathBuf::from(v));
            }
            "--config" => {
                i += 1;
                let v = args.get(i).ok_or("--config requires PATH")?;
                config = Some(PathBuf::from(v));
            }
            "--content" => {
                i += 1;
                let v = args.get(i).ok_or("--content requires JSON")?;
                flags.content = Some(v.to_string());
            }
            "--parent" => {
                i += 1;
                let v = args.get(i).ok_or("--parent requires ID")?;
                flags.parent = Some(parse_id(v, "--parent")?);
            }
            "--after" => {
                i += 1;
                let v = args.get(i).ok_or("--after requires ID")?;
                flags.after = Some(parse_id(v, "--after")?);
            }
            "--start" => {
                i += 1;
                let v = args.get(i).ok_or("--start requires ID")?;
                flags.start = Some(parse_id(v, "--start")?);
            }
            "--levels" => {
                i += 1;
                let v = args.get(i).ok_or("--levels requires N")?;
                flags.levels = Some(
                    v.parse::<usize>()
                        .map_err(|_| "--levels must be a non-negative integer")?,
                );
            }
            "--depth" => {
                i += 1;
                let v = args.get(i).ok_or("--depth requires N")?;
                flags.depth = Some(
                    v.parse::<usize>()
                        .map_err(|_| "--depth must be a non-negative integer")?,
                );
            }
            "--field" => {
                i += 1;
                let v = args.get(i).ok_or("--field requires NAME")?;
                flags.field = Some(v.to_string());
            }
            "--separator" => {
                i += 1;
                let v = args.get(i).ok_or("--separator requires TEXT")?;
                flags.separator = Some(v.to_string());
            }
            "--first" => flags.first = true,
            other if other.starts_with("--") => return Err(format!("unknown flag: {other}")),
            other => positional.push(other.to_string()),
        }
        i += 1;
    }

    let Some((name, rest)) = positional.split_first() else {
        return Err("missing command (try --help)".to_string());
    };
    let command = build_command(name, rest, flags)?;

    let db = db.ok_or("--db PATH (or ORGTREE_DB) is required")?;
    let config = config.ok_or("--config PATH (or ORGTREE_CONFIG) is required")?;
    Ok(Invocation {
        db,
        config,
        command,
    })
}

fn build_command(name: &str, rest: &[String], flags: Flags) -> Result<Command, String> {
    let command = match name {
        "init" => {
            no_operands(name, rest)?;
            Command::Init
        }
        "insert" => {
            no_operands(name, rest)?;
            let placement = match (flags.parent, flags.after) {
                (None, None) => Placement::Root,
                (Some(parent), None) => Placement::FirstChildOf(parent),
                (None, Some(sibling)) => Placement::After(sibling),
                (Some(_), Some(_)) => {
                    return Err("insert takes either --parent or --after, not both".to_string());
                }
            };
            Command::Insert {
                content: flags.content.unwrap_or_else(|| "{}".to_string()),
                placement,
            }
        }
        "update" => Command::Update {
            id: single_id(name, rest)?,
            content: flags
                .content
                .ok_or("update requires --content JSON")?,
        },
        "move" => {
            let target = match (flags.parent, flags.after) {
                (Some(parent), None) => MoveTarget::FirstChildOf(parent),
                (None, Some(sibling)) => MoveTarget::After(sibling),
                _ => return Err("move requires exactly one of --parent or --after".to_string()),
            };
            Command::Move {
                ids: id_list(name, rest)?,
                target,
            }
        }
        "delete" => Command::Delete {
            id: single_id(name, rest)?,
        },
        "get" => Command::Get {
            id: single_id(name, rest)?,
        },
        "path" => Command::Path {
            id: single_id(name, rest)?,
            field: flags.field,
            separator: flags
                .separator
                .unwrap_or_else(|| DEFAULT_SEPARATOR.to_string()),
        },
        "depth" => Command::Depth {
            id: single_id(name, rest)?,
        },
        "children" => {
            let query = if flags.first {
                ChildrenQuery::first_only()
            } else {
                ChildrenQuery::levels(flags.levels.unwrap_or(1))
            };
            Command::Children {
                ids: id_list(name, rest)?,
                query,
            }
        }
        "siblings" => Command::Siblings {
            id: single_id(name, rest)?,
        },
        "resolve" => {
            let [path] = rest else {
                return Err("resolve takes exactly one PATH".to_string());
            };
            Command::Resolve {
                path: path.to_string(),
                start: flags.start,
                field: flags
                    .field
                    .unwrap_or_else(|| DEFAULT_PATH_FIELD.to_string()),
                separator: flags
                    .separator
                    .unwrap_or_else(|| DEFAULT_SEPARATOR.to_string()),
            }
        }
        "subtree" => Command::Subtree {
            id: single_id(name, rest)?,
            max_depth: flags.depth,
        },
        "verify" => {
            no_operands(name, rest)?;
            Command::Verify
        }
        other => return Err(format!("unknown command: {other}")),
    };
    Ok(command)
}

fn parse_id(value: &str, what: &str) -> Result<NodeId, String> {
    NodeId::parse(value).map_err(|err| format!("{what}: {}", err.message()))
}

fn no_operands(name: &str, rest: &[String]) -> Result<(), String> {
    if rest.is_empty() {
        Ok(())
    } else {
        Err(format!("{name} takes no operands"))
    }
}

fn single_id(name: &str, rest: &[String]) -> Result<NodeId, String> {
    let [id] = rest else {
        return Err(format!("{name} takes exactly one ID"));
    };
    parse_id(id, name)
}

/// `1,2,3` or separate operands.
fn id_list(name: &str, rest: &[String]) -> Result<Vec<NodeId>, String> {
    let ids = rest
        .iter()
        .flat_map(|operand| operand.split(','))
        .filter(|part| !part.trim().is_empty())
        .map(|part| parse_id(part, name))
        .collect::<Result<Vec<_>, _>>()?;
    if ids.is_empty() {
        return Err(format!("{name} requires at least one ID"));
    }
    Ok(ids)
}
