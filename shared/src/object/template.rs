use std::collections::{HashMap, HashSet};

use log::{debug, warn};

/// What role instances of a template play in the session
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TemplateKind {
    /// An ordinary replicated object
    Object,
    /// An object that takes part in portal registration and linking
    Portal,
    /// A container other objects are grouped under
    World,
    /// Managers, controllers and cameras; never replayed to late joiners
    Infrastructure,
}

/// Recipe the engine uses to build an instance. `parts` counts the root plus
/// every replicable child, and is the size of the id set the instance needs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Template {
    tag: String,
    parts: usize,
    kind: TemplateKind,
}

impl Template {
    pub fn new(tag: impl Into<String>, parts: usize, kind: TemplateKind) -> Self {
        Self {
            tag: tag.into(),
            parts: parts.max(1),
            kind,
        }
    }

    pub fn object(tag: impl Into<String>) -> Self {
        Self::new(tag, 1, TemplateKind::Object)
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn parts(&self) -> usize {
        self.parts
    }

    pub fn kind(&self) -> TemplateKind {
        self.kind
    }

    pub fn is_infrastructure(&self) -> bool {
        self.kind == TemplateKind::Infrastructure
    }
}

/// Named folder of templates, possibly nested
#[derive(Clone, Debug, Default)]
pub struct TemplateFolder {
    name: String,
    templates: Vec<Template>,
    folders: Vec<TemplateFolder>,
}

impl TemplateFolder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            templates: Vec::new(),
            folders: Vec::new(),
        }
    }

    pub fn with_template(mut self, template: Template) -> Self {
        self.templates.push(template);
        self
    }

    pub fn with_folder(mut self, folder: TemplateFolder) -> Self {
        self.folders.push(folder);
        self
    }

    pub fn add_template(&mut self, template: Template) {
        self.templates.push(template);
    }

    pub fn add_folder(&mut self, folder: TemplateFolder) {
        self.folders.push(folder);
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn get(&self, tag: &str) -> Option<&Template> {
        self.templates.iter().find(|template| template.tag == tag)
    }

    fn dive(&self, tag: &str) -> Option<&Template> {
        for folder in &self.folders {
            if let Some(template) = folder.get(tag) {
                debug!("Found template `{}` in folder `{}`", tag, folder.name);
                return Some(template);
            }
            if let Some(template) = folder.dive(tag) {
                return Some(template);
            }
        }
        None
    }

    fn visit<'a>(&'a self, output: &mut Vec<&'a Template>) {
        output.extend(self.templates.iter());
        for folder in &self.folders {
            folder.visit(output);
        }
    }
}

/// Resolves template tags to templates.
///
/// Lookup order is: cache, root folder, then a depth-first dive through the
/// sub-folders. Only hits are memoised, so a template added after a miss is
/// still found later.
pub struct TemplateCatalog {
    root: TemplateFolder,
    cache: HashMap<String, Template>,
    use_cache: bool,
}

impl TemplateCatalog {
    pub fn new(root: TemplateFolder) -> Self {
        Self {
            root,
            cache: HashMap::new(),
            use_cache: true,
        }
    }

    pub fn set_use_cache(&mut self, use_cache: bool) {
        self.use_cache = use_cache;
        if !use_cache {
            self.cache.clear();
        }
    }

    pub fn root_mut(&mut self) -> &mut TemplateFolder {
        &mut self.root
    }

    pub fn resolve(&mut self, tag: &str) -> Option<Template> {
        if self.use_cache {
            if let Some(template) = self.cache.get(tag) {
                return Some(template.clone());
            }
        }

        let found = self
            .root
            .get(tag)
            .or_else(|| self.root.dive(tag))
            .cloned();

        match &found {
            Some(template) if self.use_cache => {
                self.cache.insert(tag.to_string(), template.clone());
            }
            Some(_) => {}
            None => warn!("Template `{}` not found in catalog", tag),
        }

        found
    }

    pub fn is_cached(&self, tag: &str) -> bool {
        self.cache.contains_key(tag)
    }

    /// Tags of every template of kind [`TemplateKind::Infrastructure`]
    pub fn infrastructure_tags(&self) -> HashSet<String> {
        self.templates()
            .into_iter()
            .filter(|template| template.is_infrastructure())
            .map(|template| template.tag.clone())
            .collect()
    }

    pub fn templates(&self) -> Vec<&Template> {
        let mut output = Vec::new();
        self.root.visit(&mut output);
        output
    }
}
