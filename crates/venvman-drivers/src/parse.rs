use regex::Regex;
use std::path::PathBuf;
use std::sync::LazyLock;

static DESTINATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"dest=([^,]+)").expect("destination pattern is valid"));

/// `name [*] path`, where the path runs to the end of the line.
static CONDA_ENVIRONMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([^\s*]\S*)\s+(?:\*\s+)?(\S.*)$").expect("conda environment pattern is valid")
});

static WINDOWS_DRIVE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z]:[\\/]").expect("drive pattern is valid"));

static CONDA_LOCATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"environment location: (.*)").expect("conda location pattern is valid")
});

/// One environment name per non-blank line, sorted.
#[must_use]
pub fn parse_name_listing(output: &str) -> Vec<String> {
    let mut names: Vec<String> = output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect();
    names.sort();
    names.dedup();
    names
}

/// `pyenv virtualenvs --bare` lists each environment twice: once by name and
/// once as `<version>/envs/<name>`. Only the plain names are kept.
#[must_use]
pub fn parse_pyenv_listing(output: &str) -> Vec<String> {
    parse_name_listing(output)
        .into_iter()
        .filter(|name| !name.contains('/'))
        .collect()
}

/// The environment directory reported by virtualenv in `dest=<path>`.
#[must_use]
pub fn parse_destination(output: &str) -> Option<PathBuf> {
    output.lines().find_map(|line| {
        DESTINATION
            .captures(line)
            .and_then(|caps| caps.get(1))
            .map(|dest| PathBuf::from(dest.as_str().trim()))
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CondaEnvironment {
    pub name: String,
    pub path: PathBuf,
}

/// Parse `conda info --envs`.
///
/// ```text
/// # conda environments:
/// #
/// base                  *  /opt/conda
/// demo                     /opt/conda/envs/demo
///                          /elsewhere/unnamed
/// ```
#[must_use]
pub fn parse_conda_environments(output: &str) -> Vec<CondaEnvironment> {
    let mut environments: Vec<CondaEnvironment> = output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| {
            let caps = CONDA_ENVIRONMENT.captures(line)?;
            let name = caps.get(1)?.as_str();
            if looks_like_path(name) {
                return None;
            }
            Some(CondaEnvironment {
                name: name.to_string(),
                path: PathBuf::from(caps.get(2)?.as_str().trim_end()),
            })
        })
        .collect();
    environments.sort_by(|a, b| a.name.cmp(&b.name));
    environments
}

/// Unnamed environments are listed by prefix alone; their first word is
/// the start of a path, not a name.
fn looks_like_path(word: &str) -> bool {
    word.starts_with(['/', '\\', '~']) || WINDOWS_DRIVE.is_match(word)
}

#[must_use]
pub fn parse_conda_location(output: &str) -> Option<PathBuf> {
    output.lines().find_map(|line| {
        CONDA_LOCATION
            .captures(line)
            .and_then(|caps| caps.get(1))
            .map(|location| location.as_str().trim())
            .filter(|location| !location.is_empty())
            .map(PathBuf::from)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_listing_is_sorted_and_skips_blank_lines() {
        let names = parse_name_listing("zeta\n\n  alpha  \nMid\n");
        assert_eq!(names, vec!["Mid", "alpha", "zeta"]);
    }

    #[test]
    fn pyenv_listing_drops_version_qualified_aliases() {
        let output = "3.11.4/envs/demo\n3.11.4/envs/tools\ndemo\ntools\n";
        assert_eq!(parse_pyenv_listing(output), vec!["demo", "tools"]);
    }

    #[test]
    fn destination_is_read_from_virtualenv_output() {
        let output = "created virtual environment CPython3.11.4.final.0-64 in 312ms\n  \
                      creator CPython3Posix(dest=/home/u/.virtualenvs/demo, clear=False, no_vcs_ignore=False, global=False)\n  \
                      seeder FromAppData(download=False, pip=bundle)\n";

        assert_eq!(
            parse_destination(output),
            Some(PathBuf::from("/home/u/.virtualenvs/demo"))
        );
    }

    #[test]
    fn destination_is_none_without_marker() {
        assert_eq!(parse_destination("Using base prefix '/usr'\n"), None);
    }

    #[test]
    fn conda_environments_skip_comments_and_unnamed_prefixes() {
        let output = "# conda environments:\n\
                      #\n\
                      base                  *  /opt/conda\n\
                      demo                     /opt/conda/envs/demo\n\
                      \x20                        /elsewhere/unnamed\n";

        assert_eq!(
            parse_conda_environments(output),
            vec![
                CondaEnvironment {
                    name: "base".to_string(),
                    path: PathBuf::from("/opt/conda"),
                },
                CondaEnvironment {
                    name: "demo".to_string(),
                    path: PathBuf::from("/opt/conda/envs/demo"),
                },
            ]
        );
    }

    #[test]
    fn conda_paths_may_contain_spaces() {
        let output = "# conda environments:\n\
                      #\n\
                      base                  *  C:\\Users\\John Doe\\miniconda3\n\
                      demo                     C:\\Users\\John Doe\\miniconda3\\envs\\demo\n\
                      \x20                        C:\\Other Place\\unnamed\n\
                      \x20                        /srv/shared envs/unnamed\n";

        assert_eq!(
            parse_conda_environments(output),
            vec![
                CondaEnvironment {
                    name: "base".to_string(),
                    path: PathBuf::from(r"C:\Users\John Doe\miniconda3"),
                },
                CondaEnvironment {
                    name: "demo".to_string(),
                    path: PathBuf::from(r"C:\Users\John Doe\miniconda3\envs\demo"),
                },
            ]
        );
    }

    #[test]
    fn conda_location_is_read_from_create_plan() {
        let output = "## Package Plan ##\n\n  environment location: /opt/conda/envs/demo\n\n  added / updated specs:\n";

        assert_eq!(
            parse_conda_location(output),
            Some(PathBuf::from("/opt/conda/envs/demo"))
        );
        assert_eq!(parse_conda_location("nothing here"), None);
    }
}
