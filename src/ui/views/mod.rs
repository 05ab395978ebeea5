mod admin;
mod admin_login;
mod home;
mod login;
mod profile;
mod public_profile;
mod story_create;
mod story_detail;
mod story_list;
mod topic_detail;

pub use admin::AdminView;
pub use admin_login::AdminLoginView;
pub use home::HomeView;
pub use login::LoginView;
pub use profile::ProfileView;
pub use public_profile::PublicProfileView;
pub use story_create::StoryCreateView;
pub use story_detail::StoryDetailView;
pub use story_list::StoryListView;
pub use topic_detail::TopicDetailView;
