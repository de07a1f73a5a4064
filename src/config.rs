use crate::property::Property;
use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::fs::File;
use std::path::{Path, PathBuf};

const PROJECT_FILE: &str = "taxogen.yaml";

/// What to do when a post's front matter can't be parsed.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum MalformedPolicy {
    /// Warn on stderr and continue with the remaining posts.
    Skip,

    /// Fail the whole run.
    Abort,
}

impl Default for MalformedPolicy {
    fn default() -> Self {
        MalformedPolicy::Skip
    }
}

#[derive(Deserialize)]
struct Project {
    #[serde(default = "default_posts_directory")]
    posts_directory: PathBuf,

    #[serde(default = "default_properties")]
    properties: Vec<ProjectProperty>,

    #[serde(default)]
    on_malformed: MalformedPolicy,
}

#[derive(Deserialize)]
struct ProjectProperty {
    name: String,

    #[serde(default)]
    singular: Option<String>,

    #[serde(default)]
    output_directory: Option<PathBuf>,
}

fn default_posts_directory() -> PathBuf {
    PathBuf::from("_posts")
}

fn default_properties() -> Vec<ProjectProperty> {
    vec![
        ProjectProperty {
            name: "categories".to_owned(),
            singular: None,
            output_directory: None,
        },
        ProjectProperty {
            name: "tags".to_owned(),
            singular: None,
            output_directory: None,
        },
    ]
}

pub struct Config {
    pub posts_directory: PathBuf,
    pub properties: Vec<Property>,
    pub on_malformed: MalformedPolicy,
}

impl Config {
    /// Loads the configuration for the project containing `dir`: the nearest
    /// `taxogen.yaml` in `dir` or any of its ancestors, or the built-in
    /// defaults rooted at `dir` when no project file exists. The defaults
    /// reproduce the stock Jekyll layout: posts in `_posts`, pages in
    /// `categories` and `tags`.
    pub fn load(dir: &Path) -> Result<Config> {
        for ancestor in dir.ancestors() {
            let path = ancestor.join(PROJECT_FILE);
            if path.exists() {
                return Config::from_project_file(&path);
            }
        }
        Ok(Config::defaults(dir))
    }

    /// The built-in configuration, with all paths rooted at `root`.
    pub fn defaults(root: &Path) -> Config {
        Project {
            posts_directory: default_posts_directory(),
            properties: default_properties(),
            on_malformed: MalformedPolicy::default(),
        }
        .into_config(root)
    }

    pub fn from_project_file(path: &Path) -> Result<Config> {
        let file = match File::open(path) {
            Ok(file) => file,
            Err(e) => {
                return Err(anyhow!(
                    "Opening project file `{}`: {}",
                    path.display(),
                    e
                ))
            }
        };
        let project: Project = match serde_yaml::from_reader(file) {
            Ok(project) => project,
            Err(e) => return Err(anyhow!("Loading configuration: {:?}", e)),
        };
        match path.parent() {
            None => Err(anyhow!(
                "Can't get parent directory for provided project file path '{:?}'",
                path
            )),
            Some(root) => Ok(project.into_config(root)),
        }
    }
}

impl Project {
    fn into_config(self, root: &Path) -> Config {
        Config {
            posts_directory: root.join(&self.posts_directory),
            properties: self
                .properties
                .into_iter()
                .map(|property| property.into_property(root))
                .collect(),
            on_malformed: self.on_malformed,
        }
    }
}

impl ProjectProperty {
    fn into_property(self, root: &Path) -> Property {
        let mut property = Property::new(&self.name, root);
        if let Some(singular) = self.singular {
            property.singular = singular;
        }
        if let Some(output_directory) = self.output_directory {
            property.output_directory = root.join(output_directory);
        }
        property
    }
}
