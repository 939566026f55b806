//! Report output for a list of inspected instances

use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};

use comfy_table::{presets, Table};

use crate::core::error::ReportError;
use crate::core::units::human_size;
use crate::core::Instance;
use crate::template::Template;

const TABLE_HEADER: [&str; 9] = [
    "NAME", "STATUS", "SSH", "VMTYPE", "ARCH", "CPUS", "MEMORY", "DISK", "DIR",
];

/// Output format selector
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Format {
    /// One compact JSON document per line
    Json,
    /// One YAML document per instance
    Yaml,
    /// Aligned columns with a header row
    #[default]
    Table,
    /// Any other string, applied to each instance in turn
    Template(String),
}

impl Format {
    pub fn parse(s: &str) -> Self {
        match s {
            "json" => Self::Json,
            "yaml" => Self::Yaml,
            "table" => Self::Table,
            other => Self::Template(other.to_string()),
        }
    }

    /// Template equivalent for the formats that are template shortcuts
    fn template_source(&self) -> Option<&str> {
        match self {
            Self::Json => Some("{{json .}}"),
            Self::Yaml => Some("{{yaml .}}"),
            Self::Table => None,
            Self::Template(source) => Some(source),
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Json => f.write_str("json"),
            Self::Yaml => f.write_str("yaml"),
            Self::Table => f.write_str("table"),
            Self::Template(source) => f.write_str(source),
        }
    }
}

/// Write `instances` to `w` in the requested format.
///
/// The table format needs the caller's home directory to shorten paths and
/// fails if it cannot be determined.
pub fn print_instances<W: Write>(
    w: &mut W,
    instances: &[Instance],
    format: &Format,
) -> Result<(), ReportError> {
    print_instances_with_home(w, instances, format, dirs::home_dir())
}

/// Like [`print_instances`] with an explicit home directory
pub fn print_instances_with_home<W: Write>(
    w: &mut W,
    instances: &[Instance],
    format: &Format,
    home: Option<PathBuf>,
) -> Result<(), ReportError> {
    let Some(source) = format.template_source() else {
        let home = home.ok_or(ReportError::NoHomeDir)?;
        return write_table(w, instances, &home);
    };

    let template = Template::parse(source).map_err(ReportError::Template)?;
    for instance in instances {
        let rendered = template
            .execute(instance)
            .map_err(|source| ReportError::Render {
                name: instance.name.clone(),
                source,
            })?;
        writeln!(w, "{}", rendered)?;
    }
    Ok(())
}

fn write_table<W: Write>(
    w: &mut W,
    instances: &[Instance],
    home: &Path,
) -> Result<(), ReportError> {
    let mut table = Table::new();
    table.load_preset(presets::NOTHING);
    table.set_header(TABLE_HEADER.to_vec());

    for instance in instances {
        table.add_row(vec![
            instance.name.clone(),
            instance.status.to_string(),
            format!("127.0.0.1:{}", instance.ssh_local_port),
            instance.vm_type.to_string(),
            instance.arch.to_string(),
            instance.cpus.to_string(),
            human_size(instance.memory),
            human_size(instance.disk),
            collapse_home(&instance.dir, home),
        ]);
    }
    for column in table.column_iter_mut() {
        column.set_padding((0, 4));
    }

    writeln!(w, "{}", table.trim_fmt())?;
    Ok(())
}

/// Replace a leading `home` with `~`
fn collapse_home(dir: &Path, home: &Path) -> String {
    match dir.strip_prefix(home) {
        Ok(rest) if rest.as_os_str().is_empty() => "~".to_string(),
        Ok(rest) => Path::new("~").join(rest).display().to_string(),
        Err(_) => dir.display().to_string(),
    }
}
