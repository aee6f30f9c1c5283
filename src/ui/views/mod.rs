mod explore;
mod login;
mod settings;
mod snippet_detail;
mod snippet_form;
mod snippet_list;

pub use explore::ExploreView;
pub use login::LoginView;
pub use settings::SettingsView;
pub use snippet_detail::SnippetDetailView;
pub use snippet_form::SnippetFormView;
pub use snippet_list::SnippetListView;
