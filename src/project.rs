//! Wizard routes and the project being assembled across them.

use std::fmt;
use std::str::FromStr;

use crate::api::GeneratedProject;

/// Everything the user has decided so far. Lives for one wizard run and is
/// wiped by [`Project::reset`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Project {
    pub document_id: Option<String>,
    pub filename: Option<String>,
    pub selected_snippets: Vec<String>,
    pub selected_practices: Vec<String>,
    pub prompt: String,
    pub generated: Option<GeneratedProject>,
}

impl Project {
    pub fn set_document(&mut self, document_id: String, filename: String) {
        self.document_id = Some(document_id);
        self.filename = Some(filename);
    }

    pub fn set_selected_snippets(&mut self, ids: Vec<String>) {
        self.selected_snippets = ids;
    }

    pub fn set_selected_practices(&mut self, ids: Vec<String>) {
        self.selected_practices = ids;
    }

    pub fn set_prompt(&mut self, prompt: String) {
        self.prompt = prompt;
    }

    pub fn set_generated(&mut self, generated: GeneratedProject) {
        self.generated = Some(generated);
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn has_document(&self) -> bool {
        self.document_id.is_some()
    }

    pub fn has_prompt(&self) -> bool {
        !self.prompt.is_empty()
    }
}

/// Add `id` when absent, remove it when present. New ids go to the end.
pub fn toggle_selection(ids: &mut Vec<String>, id: &str) {
    if let Some(pos) = ids.iter().position(|existing| existing == id) {
        ids.remove(pos);
    } else {
        ids.push(id.to_string());
    }
}

/// Screens of the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Route {
    #[default]
    Home,
    Upload,
    Snippets,
    Practices,
    Preview,
    Generation,
}

/// Wizard steps in order. Home is not a step.
pub const STEPS: [Route; 5] = [
    Route::Upload,
    Route::Snippets,
    Route::Practices,
    Route::Preview,
    Route::Generation,
];

impl Route {
    pub fn path(self) -> &'static str {
        match self {
            Route::Home => "/",
            Route::Upload => "/upload",
            Route::Snippets => "/snippets",
            Route::Practices => "/practices",
            Route::Preview => "/preview",
            Route::Generation => "/generation",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Route::Home => "Home",
            Route::Upload => "Upload",
            Route::Snippets => "Snippets",
            Route::Practices => "Practices",
            Route::Preview => "Preview",
            Route::Generation => "Generation",
        }
    }

    /// Position in [`STEPS`], `None` for Home.
    pub fn step_index(self) -> Option<usize> {
        STEPS.iter().position(|&step| step == self)
    }

    /// Where navigation to this route actually lands, given what the project
    /// holds. Steps whose input is missing send the user back to Upload.
    pub fn guard(self, project: &Project) -> Route {
        let allowed = match self {
            Route::Home | Route::Upload => true,
            Route::Snippets | Route::Practices | Route::Preview => project.has_document(),
            Route::Generation => project.has_prompt(),
        };
        if allowed { self } else { Route::Upload }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

impl FromStr for Route {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().trim_end_matches('/');
        let route = match normalized {
            "" => Route::Home,
            "/upload" | "upload" => Route::Upload,
            "/snippets" | "snippets" => Route::Snippets,
            "/practices" | "practices" => Route::Practices,
            "/preview" | "preview" => Route::Preview,
            "/generation" | "generation" => Route::Generation,
            other => return Err(format!("unknown route: {}", other)),
        };
        Ok(route)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn project_with_document() -> Project {
        let mut project = Project::default();
        project.set_document("doc-1".to_string(), "req.md".to_string());
        project
    }

    #[test]
    fn test_guard_without_document_redirects_to_upload() {
        let project = Project::default();
        for route in [Route::Snippets, Route::Practices, Route::Preview, Route::Generation] {
            assert_eq!(route.guard(&project), Route::Upload, "{route}");
        }
        assert_eq!(Route::Home.guard(&project), Route::Home);
        assert_eq!(Route::Upload.guard(&project), Route::Upload);
    }

    #[test]
    fn test_guard_with_document_allows_selection_steps() {
        let project = project_with_document();
        assert_eq!(Route::Snippets.guard(&project), Route::Snippets);
        assert_eq!(Route::Practices.guard(&project), Route::Practices);
        assert_eq!(Route::Preview.guard(&project), Route::Preview);
        // Generation needs a prompt, not just a document.
        assert_eq!(Route::Generation.guard(&project), Route::Upload);
    }

    #[test]
    fn test_guard_generation_with_prompt() {
        let mut project = project_with_document();
        project.set_prompt("## Document Requirements".to_string());
        assert_eq!(Route::Generation.guard(&project), Route::Generation);
    }

    #[test]
    fn test_toggle_selection_adds_and_removes() {
        let mut ids = Vec::new();
        toggle_selection(&mut ids, "senior_dev");
        toggle_selection(&mut ids, "qa_perspective");
        toggle_selection(&mut ids, "generate_tests");
        assert_eq!(ids, ["senior_dev", "qa_perspective", "generate_tests"]);

        toggle_selection(&mut ids, "qa_perspective");
        assert_eq!(ids, ["senior_dev", "generate_tests"]);

        toggle_selection(&mut ids, "qa_perspective");
        assert_eq!(ids, ["senior_dev", "generate_tests", "qa_perspective"]);
    }

    #[test]
    fn test_reset_clears_everything() {
        let mut project = project_with_document();
        project.set_selected_snippets(vec!["senior_dev".to_string()]);
        project.set_selected_practices(vec!["clean-code".to_string()]);
        project.set_prompt("prompt".to_string());

        project.reset();
        assert_eq!(project, Project::default());
        assert!(!project.has_document());
        assert!(!project.has_prompt());
    }

    #[test]
    fn test_route_paths_round_trip() {
        for route in [
            Route::Home,
            Route::Upload,
            Route::Snippets,
            Route::Practices,
            Route::Preview,
            Route::Generation,
        ] {
            assert_eq!(route.path().parse::<Route>().unwrap(), route);
        }
        assert_eq!("preview".parse::<Route>().unwrap(), Route::Preview);
        assert_eq!("/snippets/".parse::<Route>().unwrap(), Route::Snippets);
        assert!("/settings".parse::<Route>().is_err());
    }

    #[test]
    fn test_step_index() {
        assert_eq!(Route::Home.step_index(), None);
        assert_eq!(Route::Upload.step_index(), Some(0));
        assert_eq!(Route::Generation.step_index(), Some(4));
    }
}
