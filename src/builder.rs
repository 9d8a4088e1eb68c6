//! Consume the raw-block stream and aggregate per-group documents.

use std::collections::{BTreeMap, HashSet};
use std::path::PathBuf;

use crate::document::{Api, Document, Param, Request, DEFAULT_GROUP};
use crate::error::{Error, ErrorSink, Result, SyntaxError};
use crate::extractor::{self, SourceSpec};
use crate::markup::{self, Element};
use crate::mock;
use crate::scanner::RawBlock;

/// Markers classifying a block, checked in this order so that the longer
/// one wins.
const APIDOC_PREFIX: &str = "<apidoc";
const API_PREFIX: &str = "<api";

/// One resolved Document per group name.
pub type DocumentSet = BTreeMap<String, Document>;

/// Parse all sources into per-group documents.
///
/// The builder is the single consumer of the block stream and the only
/// writer to the document set: workers hand blocks over by message
/// passing, so appends need no lock while remaining atomic with respect
/// to each other. The final pass runs after the stream closes — i.e.
/// after the pipeline's join barrier — against the then-stable set.
///
/// Per-block failures go to `sink`; only an invalid input specification
/// is returned as a hard error.
pub fn parse(specs: Vec<SourceSpec>, sink: &ErrorSink) -> Result<DocumentSet> {
    let blocks = extractor::extract(specs, sink)?;

    let mut builder = DocumentBuilder::new();
    for block in blocks {
        builder.process(&block, sink);
    }

    Ok(builder.finish(sink))
}

/// Aggregates parsed annotation blocks into documents.
#[derive(Debug, Default)]
pub struct DocumentBuilder {
    docs: DocumentSet,
}

impl DocumentBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Classify and process one raw comment block.
    ///
    /// Blocks that do not start with a recognized marker are ordinary
    /// comments and are silently ignored. A classified block that fails to
    /// parse or violates an invariant is reported and dropped; the first
    /// violation wins, later ones in the same block go unreported.
    pub fn process(&mut self, block: &RawBlock, sink: &ErrorSink) {
        let content = String::from_utf8_lossy(&block.data);
        let content = content.trim_start();

        let expected = if content.starts_with(APIDOC_PREFIX) {
            "apidoc"
        } else if content.starts_with(API_PREFIX) {
            "api"
        } else {
            return;
        };

        let element = match markup::parse(content.as_bytes()) {
            Ok(element) => element,
            Err(e) => {
                sink.syntax(e.at(&block.path, block.line));
                return;
            }
        };
        if element.name != expected {
            // A prefix like `<apikey` is not an annotation.
            return;
        }

        match element.name.as_str() {
            "apidoc" => self.process_meta(&element, block, sink),
            _ => self.process_api(&element, block, sink),
        }
    }

    /// Deserialize a `<apidoc>` metadata block into its group's document.
    fn process_meta(&mut self, element: &Element, block: &RawBlock, sink: &ErrorSink) {
        let group = group_of(element);
        let doc = self.docs.entry(group).or_insert_with(Document::new);

        if !doc.title.is_empty() {
            sink.syntax(
                SyntaxError::new("apidoc", "duplicate value").at(&block.path, block.line),
            );
            return;
        }

        // Apply to a draft first so a failing block leaves the live
        // document untouched.
        let mut draft = Document::new();
        match draft.apply_meta(element) {
            Ok(()) => {
                doc.title = draft.title;
                doc.version = draft.version;
                doc.description = draft.description;
                doc.definitions = draft.definitions;
            }
            Err(e) => sink.syntax(e.in_field("apidoc").at(&block.path, block.line)),
        }
    }

    /// Deserialize an `<api>` block and link it into its group's document.
    fn process_api(&mut self, element: &Element, block: &RawBlock, sink: &ErrorSink) {
        let draft = Api::from_element(element).and_then(|api| {
            api.sanitize()?;
            Ok(api)
        });

        match draft {
            Ok(mut api) => {
                api.file = block.path.clone();
                api.line = block.line;
                let group = group_of(element);
                self.docs
                    .entry(group)
                    .or_insert_with(Document::new)
                    .apis
                    .push(api);
            }
            Err(e) => sink.syntax(e.in_field("api").at(&block.path, block.line)),
        }
    }

    /// Final single-threaded pass over the stable document set: resolve
    /// references, validate inline examples, detect duplicate routes.
    pub fn finish(mut self, sink: &ErrorSink) -> DocumentSet {
        for doc in self.docs.values_mut() {
            let definitions = doc.definitions.clone();
            let mut valid = true;

            for api in &mut doc.apis {
                let mut resolver = Resolver {
                    definitions: &definitions,
                    file: api.file.clone(),
                    line: api.line,
                    sink,
                    ok: true,
                };
                for request in &mut api.requests {
                    resolver.request(request, "api.request");
                }
                for response in &mut api.responses {
                    resolver.request(response, "api.response");
                }
                for query in &mut api.queries {
                    resolver.param(query, "api.query");
                }
                for callback in &mut api.callbacks {
                    for request in &mut callback.requests {
                        resolver.request(request, "api.callback.request");
                    }
                    for response in &mut callback.responses {
                        resolver.request(response, "api.callback.response");
                    }
                }
                valid &= resolver.ok;
            }

            for api in &doc.apis {
                for request in api.requests.iter().chain(api.responses.iter()) {
                    validate_examples(request, api, sink);
                }
            }

            let mut seen = HashSet::new();
            for api in &doc.apis {
                if !seen.insert((api.method.clone(), api.path.clone())) {
                    sink.error(
                        &api.file,
                        "api",
                        api.line,
                        format!("duplicate route `{} {}`", api.method, api.path),
                    );
                }
            }

            doc.valid = valid;
        }

        self.docs
    }
}

fn group_of(element: &Element) -> String {
    match element.attr("group") {
        Some(group) if !group.is_empty() => group.to_string(),
        _ => DEFAULT_GROUP.to_string(),
    }
}

/// Reference substitution over one api entry. Unresolved or circular
/// references are reported and clear `ok`; substitution copies the
/// definition's shape while the referring node keeps its own name.
struct Resolver<'a> {
    definitions: &'a BTreeMap<String, Param>,
    file: PathBuf,
    line: usize,
    sink: &'a ErrorSink,
    ok: bool,
}

impl Resolver<'_> {
    fn request(&mut self, request: &mut Request, field: &str) {
        if let Some(name) = request.reference.clone() {
            match self.lookup(&name, field) {
                Some(def) => {
                    request.ptype = def.ptype;
                    request.array = request.array || def.array;
                    request.items = def.items.clone();
                    request.enums = def.enums.clone();
                }
                None => return,
            }
        }
        let mut active = HashSet::new();
        if let Some(name) = &request.reference {
            active.insert(name.clone());
        }
        for item in &mut request.items {
            self.param_inner(item, field, &mut active);
        }
    }

    fn param(&mut self, param: &mut Param, field: &str) {
        let mut active = HashSet::new();
        self.param_inner(param, field, &mut active);
    }

    fn param_inner(&mut self, param: &mut Param, field: &str, active: &mut HashSet<String>) {
        let field = if param.name.is_empty() {
            field.to_string()
        } else {
            format!("{field}.{}", param.name)
        };

        if let Some(name) = param.reference.clone() {
            if !active.insert(name.clone()) {
                self.sink.error(
                    &self.file,
                    &field,
                    self.line,
                    format!("circular reference `{name}`"),
                );
                self.ok = false;
                return;
            }
            match self.lookup(&name, &field) {
                Some(def) => {
                    param.ptype = def.ptype;
                    param.array = param.array || def.array;
                    param.items = def.items.clone();
                    param.enums = def.enums.clone();
                }
                None => {
                    active.remove(&name);
                    return;
                }
            }
            for item in &mut param.items {
                self.param_inner(item, &field, active);
            }
            active.remove(&name);
            return;
        }

        for item in &mut param.items {
            self.param_inner(item, &field, active);
        }
    }

    fn lookup(&mut self, name: &str, field: &str) -> Option<Param> {
        match self.definitions.get(name) {
            Some(def) => Some(def.clone()),
            None => {
                let err = Error::Reference {
                    reference: name.to_string(),
                    field: field.to_string(),
                };
                self.sink.error(&self.file, field, self.line, err.to_string());
                self.ok = false;
                None
            }
        }
    }
}

/// Check every inline JSON example against its declared body shape.
fn validate_examples(request: &Request, api: &Api, sink: &ErrorSink) {
    for example in &request.examples {
        if !example.mimetype.is_empty() && example.mimetype != "json" {
            continue;
        }
        match mock::validate(&request.to_param(), example.content.as_bytes()) {
            Ok(()) => {}
            Err(Error::SchemaMismatch { path, message }) => {
                let field = if path.is_empty() {
                    "example".to_string()
                } else {
                    format!("example.{path}")
                };
                sink.error(&api.file, &field, api.line, message);
            }
            Err(other) => {
                sink.error(&api.file, "example", api.line, other.to_string());
            }
        }
    }
}
