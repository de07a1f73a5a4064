//! Exports the [`refresh_pages`] function which stitches together the
//! high-level steps of regenerating the property pages: scanning the posts
//! directory, collecting each configured property's values from every post's
//! front matter ([`crate::post`]), and rewriting each property's output
//! directory ([`crate::property`]).
//!
//! Posts are read exactly once per run: a single pass extracts the values of
//! every configured property from each post, and the per-property aggregates
//! are handed to the page writer by value. A malformed post is handled
//! according to [`Config::on_malformed`]: by default it is skipped with a
//! warning so one bad post doesn't block regeneration for the whole site.

use crate::config::{Config, MalformedPolicy};
use crate::post::{self, Error as PostError, Frontmatter};
use crate::property::{self, Error as WriteError};
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

/// Regenerates every configured property's pages from the current posts.
/// This is the whole pipeline; on success the output directories exactly
/// reflect the posts' front matter.
pub fn refresh_pages(config: &Config) -> Result<()> {
    let mut aggregates: Vec<Vec<String>> =
        config.properties.iter().map(|_| Vec::new()).collect();

    let posts = post::scan(&config.posts_directory).map_err(|err| Error::Scan {
        path: config.posts_directory.clone(),
        err,
    })?;
    for result in posts {
        let path = result.map_err(|err| Error::Scan {
            path: config.posts_directory.clone(),
            err,
        })?;
        match post_values(&path, config) {
            Ok(values) => {
                for (aggregate, values) in aggregates.iter_mut().zip(values) {
                    aggregate.extend(values);
                }
            }
            Err(err) => match config.on_malformed {
                MalformedPolicy::Skip if err.is_format() => {
                    eprintln!("Warning: skipping post: {}", err);
                }
                _ => return Err(Error::Parse(err)),
            },
        }
    }

    let template = property::page_template()?;
    let writer = property::Writer {
        template: &template,
    };
    for (property, values) in config.properties.iter().zip(&aggregates) {
        writer.write_pages(property, values)?;
    }
    Ok(())
}

/// Collects the values of every configured property from a single post, in
/// configuration order. Fails as a unit: a post whose front matter can't be
/// parsed (or whose property values are malformed) contributes nothing.
fn post_values(path: &Path, config: &Config) -> post::Result<Vec<Vec<String>>> {
    let frontmatter = Frontmatter::load(path)?;
    config
        .properties
        .iter()
        .map(|property| frontmatter.property_values(&property.name))
        .collect()
}

/// The result of a page-refresh run.
pub type Result<T> = std::result::Result<T, Error>;

/// The error type for a page-refresh run. Errors can be during scanning the
/// posts directory, parsing posts, or writing pages.
#[derive(Debug)]
pub enum Error {
    /// Returned for I/O problems enumerating the posts directory.
    Scan { path: PathBuf, err: io::Error },

    /// Returned for errors parsing a post, when the configured policy does
    /// not allow skipping it.
    Parse(PostError),

    /// Returned for errors writing property pages to disk.
    Write(WriteError),
}

impl fmt::Display for Error {
    /// Implements [`fmt::Display`] for [`Error`].
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Scan { path, err } => {
                write!(f, "Scanning posts directory '{}': {}", path.display(), err)
            }
            Error::Parse(err) => err.fmt(f),
            Error::Write(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for Error {
    /// Implements [`std::error::Error`] for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Scan { path: _, err } => Some(err),
            Error::Parse(err) => Some(err),
            Error::Write(err) => Some(err),
        }
    }
}

impl From<PostError> for Error {
    /// Converts [`PostError`]s into [`Error`]. This allows us to use the `?`
    /// operator.
    fn from(err: PostError) -> Error {
        Error::Parse(err)
    }
}

impl From<WriteError> for Error {
    /// Converts [`WriteError`]s into [`Error`]. This allows us to use the
    /// `?` operator.
    fn from(err: WriteError) -> Error {
        Error::Write(err)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::collections::HashMap;
    use std::fs;
    use tempfile::tempdir;

    fn write_post(root: &Path, name: &str, contents: &str) {
        let posts = root.join("_posts");
        fs::create_dir_all(&posts).unwrap();
        fs::write(posts.join(name), contents).unwrap();
    }

    fn page_names(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir)
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    fn snapshot(dir: &Path) -> HashMap<String, String> {
        page_names(dir)
            .into_iter()
            .map(|name| {
                let contents = fs::read_to_string(dir.join(&name)).unwrap();
                (name, contents)
            })
            .collect()
    }

    #[test]
    fn test_travel_food_scenario() -> Result<()> {
        let dir = tempdir().unwrap();
        write_post(
            dir.path(),
            "one.md",
            "---\ncategories: [Travel, Food]\n---\nbody\n",
        );
        write_post(dir.path(), "two.md", "---\ncategories: Travel\n---\nbody\n");

        refresh_pages(&Config::defaults(dir.path()))?;

        assert_eq!(
            page_names(&dir.path().join("categories")),
            vec!["food.md".to_owned(), "travel.md".to_owned()]
        );
        assert_eq!(
            fs::read_to_string(dir.path().join("categories").join("travel.md")).unwrap(),
            "---\nlayout: categorypage\ncategory: Travel\n---\n"
        );
        assert_eq!(
            fs::read_to_string(dir.path().join("categories").join("food.md")).unwrap(),
            "---\nlayout: categorypage\ncategory: Food\n---\n"
        );
        // Neither post declares tags, so the tags directory is empty.
        assert_eq!(page_names(&dir.path().join("tags")), Vec::<String>::new());
        Ok(())
    }

    #[test]
    fn test_scalar_and_sequence_normalize_equivalently() -> Result<()> {
        let dir = tempdir().unwrap();
        write_post(dir.path(), "one.md", "---\ntags: Travel\n---\nbody\n");
        write_post(dir.path(), "two.md", "---\ntags: [Travel]\n---\nbody\n");

        refresh_pages(&Config::defaults(dir.path()))?;

        assert_eq!(
            page_names(&dir.path().join("tags")),
            vec!["travel.md".to_owned()]
        );
        Ok(())
    }

    #[test]
    fn test_idempotent() -> Result<()> {
        let dir = tempdir().unwrap();
        write_post(
            dir.path(),
            "one.md",
            "---\ncategories: [Travel]\ntags: [rust, ssg]\n---\nbody\n",
        );
        let config = Config::defaults(dir.path());

        refresh_pages(&config)?;
        let categories = snapshot(&dir.path().join("categories"));
        let tags = snapshot(&dir.path().join("tags"));

        refresh_pages(&config)?;
        assert_eq!(snapshot(&dir.path().join("categories")), categories);
        assert_eq!(snapshot(&dir.path().join("tags")), tags);
        Ok(())
    }

    #[test]
    fn test_stale_pages_removed() -> Result<()> {
        let dir = tempdir().unwrap();
        write_post(dir.path(), "one.md", "---\ntags: [Travel]\n---\nbody\n");
        let config = Config::defaults(dir.path());
        refresh_pages(&config)?;
        assert_eq!(
            page_names(&dir.path().join("tags")),
            vec!["travel.md".to_owned()]
        );

        // The tag disappears from every post; its page must not survive the
        // next run.
        write_post(dir.path(), "one.md", "---\ntags: [Food]\n---\nbody\n");
        refresh_pages(&config)?;
        assert_eq!(
            page_names(&dir.path().join("tags")),
            vec!["food.md".to_owned()]
        );
        Ok(())
    }

    #[test]
    fn test_empty_posts_directory() -> Result<()> {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("_posts")).unwrap();

        refresh_pages(&Config::defaults(dir.path()))?;

        assert_eq!(
            page_names(&dir.path().join("categories")),
            Vec::<String>::new()
        );
        assert_eq!(page_names(&dir.path().join("tags")), Vec::<String>::new());
        Ok(())
    }

    #[test]
    fn test_missing_posts_directory() {
        let dir = tempdir().unwrap();
        match refresh_pages(&Config::defaults(dir.path())) {
            Err(Error::Scan { .. }) => (),
            other => panic!("expected Scan error, got {:?}", other),
        }
    }

    #[test]
    fn test_malformed_post_skipped() -> Result<()> {
        let dir = tempdir().unwrap();
        write_post(dir.path(), "good.md", "---\ntags: [Travel]\n---\nbody\n");
        write_post(dir.path(), "bad.md", "---\ntags: [Broken]\nno closing fence\n");
        write_post(dir.path(), "fine.md", "---\ntags: [Food]\n---\nbody\n");

        refresh_pages(&Config::defaults(dir.path()))?;

        // The malformed post contributes nothing; the rest still generate.
        assert_eq!(
            page_names(&dir.path().join("tags")),
            vec!["food.md".to_owned(), "travel.md".to_owned()]
        );
        Ok(())
    }

    #[test]
    fn test_malformed_post_aborts_under_strict_policy() {
        let dir = tempdir().unwrap();
        write_post(dir.path(), "good.md", "---\ntags: [Travel]\n---\nbody\n");
        write_post(dir.path(), "bad.md", "no front matter at all\n");

        let mut config = Config::defaults(dir.path());
        config.on_malformed = MalformedPolicy::Abort;
        match refresh_pages(&config) {
            Err(Error::Parse(err)) => assert!(err.is_format()),
            other => panic!("expected Parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_post_without_property_contributes_nothing() -> Result<()> {
        let dir = tempdir().unwrap();
        write_post(dir.path(), "one.md", "---\ntitle: No taxonomy here\n---\nbody\n");

        refresh_pages(&Config::defaults(dir.path()))?;

        assert_eq!(
            page_names(&dir.path().join("categories")),
            Vec::<String>::new()
        );
        assert_eq!(page_names(&dir.path().join("tags")), Vec::<String>::new());
        Ok(())
    }
}
