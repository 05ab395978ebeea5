use crate::api::types::{Story, Subtopic, Topic};
use crate::api::{Notice, NoticeLink};
use crate::create::{failure_notice, AgeGroup, StoryForm, GENERATING_MESSAGE};
use crate::query::Query;
use crate::reconcile::{Reconciled, Source};
use crate::services::Services;
use crate::storage::Namespace;
use crate::ui::components::{InputResult, KeyResult, Picker, PickerEvent, PickerItem, TextInput};
use crate::ui::view::{GatedAction, ShortcutInfo, View, ViewAction};
use crate::ui::views::StoryDetailView;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};

const LEFT_WHILE_GENERATING: &str = "Still writing your story, you will be told when it is ready";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Row {
  Topic,
  Subtopic,
  Theme,
  AgeGroup,
  Character,
  Kazanim,
  Submit,
}

const ROWS: [Row; 7] = [
  Row::Topic,
  Row::Subtopic,
  Row::Theme,
  Row::AgeGroup,
  Row::Character,
  Row::Kazanim,
  Row::Submit,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PickerTarget {
  Topic,
  Subtopic,
  AgeGroup,
}

/// Story creation form
pub struct StoryCreateView {
  services: Services,
  topics: Query<Reconciled<Topic>>,
  subtopics: Query<Vec<Subtopic>>,
  creating: Query<Story>,
  form: StoryForm,
  theme: TextInput,
  character: TextInput,
  row: usize,
  editing: bool,
  picker: Picker,
  picker_target: Option<PickerTarget>,
}

impl StoryCreateView {
  pub fn new(services: Services, topic_id: Option<String>, subtopic_id: Option<String>) -> Self {
    let reconciler = services.reconciler.clone();
    let mut topics = Query::new(move || {
      let reconciler = reconciler.clone();
      async move { Ok(reconciler.create_page().await) }
    });
    if let Some(cached) = services.reconciler.instant::<Topic>(Namespace::Topics) {
      topics.seed(Reconciled::new(cached, Source::Cache));
    }
    topics.fetch();

    let mut view = Self {
      services,
      topics,
      subtopics: Query::manual(),
      creating: Query::manual(),
      form: StoryForm {
        topic_id,
        subtopic_id,
        ..StoryForm::default()
      },
      theme: TextInput::new(),
      character: TextInput::new(),
      row: 0,
      editing: false,
      picker: Picker::new(),
      picker_target: None,
    };
    view.load_subtopics();
    view
  }

  fn load_subtopics(&mut self) {
    let Some(topic_id) = self.form.topic_id.clone() else {
      return;
    };
    let api = self.services.api.clone();
    self
      .subtopics
      .dispatch(async move { api.list_subtopics(&topic_id).await });
  }

  fn topic_items(&self) -> &[Topic] {
    self
      .topics
      .data()
      .map(|r| r.items.as_slice())
      .unwrap_or(&[])
  }

  fn subtopic_items(&self) -> &[Subtopic] {
    self.subtopics.data().map(|s| s.as_slice()).unwrap_or(&[])
  }

  fn topic_name(&self) -> Option<&str> {
    let id = self.form.topic_id.as_deref()?;
    self
      .topic_items()
      .iter()
      .find(|t| t.id == id)
      .map(|t| t.name.as_str())
      .or(Some(id))
  }

  fn subtopic(&self) -> Option<&Subtopic> {
    let id = self.form.subtopic_id.as_deref()?;
    self.subtopic_items().iter().find(|s| s.id == id)
  }

  fn current_row(&self) -> Row {
    ROWS[self.row]
  }

  fn open_picker(&mut self, target: PickerTarget) {
    let (title, items, current): (&str, Vec<PickerItem>, Option<String>) = match target {
      PickerTarget::Topic => (
        "Topic",
        self
          .topic_items()
          .iter()
          .map(|t| PickerItem::new(t.id.clone(), format!("{} {}", t.icon, t.name)))
          .collect(),
        self.form.topic_id.clone(),
      ),
      PickerTarget::Subtopic => {
        let mut items = vec![PickerItem::new("", "No subtopic")];
        items.extend(
          self
            .subtopic_items()
            .iter()
            .map(|s| PickerItem::new(s.id.clone(), s.name.clone()).with_hint(s.kazanim.clone())),
        );
        ("Subtopic", items, self.form.subtopic_id.clone())
      }
      PickerTarget::AgeGroup => (
        "Age group",
        AgeGroup::ALL
          .iter()
          .map(|a| PickerItem::new(a.as_param(), a.label()))
          .collect(),
        self.form.age_group.map(|a| a.as_param().to_string()),
      ),
    };
    self.picker.show(title, items, current.as_deref());
    self.picker_target = Some(target);
  }

  fn apply_pick(&mut self, id: String) {
    match self.picker_target.take() {
      Some(PickerTarget::Topic) => {
        if self.form.topic_id.as_deref() != Some(id.as_str()) {
          self.form.topic_id = Some(id);
          self.form.subtopic_id = None;
          self.form.kazanim_based = false;
          self.load_subtopics();
        }
      }
      Some(PickerTarget::Subtopic) => {
        self.form.subtopic_id = (!id.is_empty()).then_some(id);
        if self.form.subtopic_id.is_none() {
          self.form.kazanim_based = false;
        }
      }
      Some(PickerTarget::AgeGroup) => {
        self.form.age_group = AgeGroup::ALL.into_iter().find(|a| a.as_param() == id);
      }
      None => {}
    }
  }

  fn text_input(&mut self) -> Option<&mut TextInput> {
    match self.current_row() {
      Row::Theme => Some(&mut self.theme),
      Row::Character => Some(&mut self.character),
      _ => None,
    }
  }

  fn submit(&mut self) -> ViewAction {
    self.form.theme = self.theme.value().to_string();
    self.form.character = self.character.value().to_string();
    let request = match self.form.to_request() {
      Ok(request) => request,
      Err(e) => return ViewAction::Notify(Notice::error(e.to_string())),
    };
    if !self.services.auth.is_authenticated() {
      return ViewAction::Notify(
        Notice::error("Log in to create stories").with_link(NoticeLink::Login),
      );
    }
    ViewAction::Gate(GatedAction::Generate(request))
  }

  fn activate_row(&mut self) -> ViewAction {
    match self.current_row() {
      Row::Topic => self.open_picker(PickerTarget::Topic),
      Row::Subtopic => {
        if self.form.topic_id.is_some() {
          self.open_picker(PickerTarget::Subtopic);
        }
      }
      Row::AgeGroup => self.open_picker(PickerTarget::AgeGroup),
      Row::Theme | Row::Character => self.editing = true,
      Row::Kazanim => self.toggle_kazanim(),
      Row::Submit => return self.submit(),
    }
    ViewAction::None
  }

  fn toggle_kazanim(&mut self) {
    if self.form.subtopic_id.is_some() {
      self.form.kazanim_based = !self.form.kazanim_based;
    }
  }

  fn render_form(&self, frame: &mut Frame, area: Rect) {
    let placeholder = |s: Option<&str>, empty: &str| match s {
      Some(v) if !v.is_empty() => Span::raw(v.to_string()),
      _ => Span::styled(empty.to_string(), Style::default().fg(Color::DarkGray)),
    };
    let text_value = |input: &TextInput, row: Row| {
      if self.editing && self.current_row() == row {
        let (before, after) = input.split_at_cursor();
        vec![
          Span::raw(before),
          Span::styled("_", Style::default().fg(Color::Yellow)),
          Span::raw(after),
        ]
      } else {
        vec![placeholder(Some(input.value()), "(press Enter to type)")]
      }
    };

    let mut lines = Vec::new();
    for (i, row) in ROWS.iter().enumerate() {
      let focused = i == self.row;
      let marker = if focused { "> " } else { "  " };
      let label_style = if focused {
        Style::default().fg(Color::Yellow).bold()
      } else {
        Style::default().fg(Color::White)
      };
      let (label, value): (&str, Vec<Span>) = match row {
        Row::Topic => ("Topic", vec![placeholder(self.topic_name(), "(choose)")]),
        Row::Subtopic => (
          "Subtopic",
          vec![placeholder(self.subtopic().map(|s| s.name.as_str()), "(optional)")],
        ),
        Row::Theme => ("Theme", text_value(&self.theme, Row::Theme)),
        Row::AgeGroup => (
          "Age group",
          vec![placeholder(self.form.age_group.map(|a| a.label()), "(choose)")],
        ),
        Row::Character => ("Character", text_value(&self.character, Row::Character)),
        Row::Kazanim => {
          let mark = if self.form.kazanim_based { "[x]" } else { "[ ]" };
          let hint = if self.form.subtopic_id.is_some() {
            " follow the subtopic's learning objective"
          } else {
            " needs a subtopic"
          };
          (
            "Kazanım",
            vec![
              Span::raw(mark),
              Span::styled(hint, Style::default().fg(Color::DarkGray)),
            ],
          )
        }
        Row::Submit => {
          lines.push(Line::raw(""));
          let style = if focused {
            Style::default().fg(Color::Black).bg(Color::Green).bold()
          } else {
            Style::default().fg(Color::Green)
          };
          lines.push(Line::from(vec![
            Span::raw(marker),
            Span::styled(" Create story ", style),
          ]));
          continue;
        }
      };
      let mut spans = vec![
        Span::raw(marker),
        Span::styled(format!("{:<11}", label), label_style),
      ];
      spans.extend(value);
      lines.push(Line::from(spans));
    }

    if let Some(kazanim) = self.subtopic().map(|s| s.kazanim.as_str()).filter(|k| !k.is_empty()) {
      lines.push(Line::raw(""));
      lines.push(Line::styled(
        format!("Kazanım: {}", kazanim),
        Style::default().fg(Color::Green),
      ));
    }

    let credits = match self.services.auth.user() {
      Some(user) => format!(" New story ({} credits left) ", user.credits),
      None => " New story (log in to create) ".to_string(),
    };
    let block = Block::default()
      .title(credits)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));
    frame.render_widget(Paragraph::new(lines).block(block).wrap(Wrap { trim: false }), area);
  }
}

impl View for StoryCreateView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    if self.creating.is_loading() {
      // Nothing to cancel server-side; the app reports the outcome instead
      if matches!(key.code, KeyCode::Char('q') | KeyCode::Esc) {
        let creating = std::mem::replace(&mut self.creating, Query::manual());
        return ViewAction::Batch(vec![
          ViewAction::Detach(creating),
          ViewAction::Notify(Notice::info(LEFT_WHILE_GENERATING)),
          ViewAction::Pop,
        ]);
      }
      return ViewAction::None;
    }

    match self.picker.handle_key(key) {
      KeyResult::Event(PickerEvent::Selected(id)) => {
        self.apply_pick(id);
        return ViewAction::None;
      }
      KeyResult::Event(PickerEvent::Cancelled) => {
        self.picker_target = None;
        return ViewAction::None;
      }
      KeyResult::Handled => return ViewAction::None,
      KeyResult::NotHandled => {}
    }

    if self.editing {
      if let Some(input) = self.text_input() {
        match input.handle_key(key) {
          InputResult::Submitted(_) | InputResult::Cancelled => self.editing = false,
          InputResult::Consumed | InputResult::NotHandled => {}
        }
        return ViewAction::None;
      }
      self.editing = false;
    }

    match key.code {
      KeyCode::Char('j') | KeyCode::Down | KeyCode::Tab => {
        self.row = (self.row + 1) % ROWS.len();
      }
      KeyCode::Char('k') | KeyCode::Up | KeyCode::BackTab => {
        self.row = (self.row + ROWS.len() - 1) % ROWS.len();
      }
      KeyCode::Char(' ') if self.current_row() == Row::Kazanim => self.toggle_kazanim(),
      KeyCode::Enter => return self.activate_row(),
      KeyCode::Char('q') | KeyCode::Esc => return ViewAction::Pop,
      _ => {}
    }
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    if self.creating.is_loading() {
      let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow));
      frame.render_widget(
        Paragraph::new(vec![
          Line::raw(""),
          Line::styled(GENERATING_MESSAGE, Style::default().fg(Color::Yellow).bold()),
          Line::raw(""),
          Line::styled(
            format!("\"{}\"", self.form.theme.trim()),
            Style::default().fg(Color::DarkGray),
          ),
        ])
        .alignment(Alignment::Center)
        .block(block),
        area,
      );
      return;
    }
    self.render_form(frame, area);
    self.picker.render_overlay(frame, area);
  }

  fn breadcrumb_label(&self) -> String {
    "Create".to_string()
  }

  fn tick(&mut self) -> ViewAction {
    self.topics.poll();
    self.subtopics.poll();

    if !self.creating.poll() {
      return ViewAction::None;
    }
    if let Some(err) = self.creating.error() {
      if err.is_silent() {
        return ViewAction::None;
      }
      return ViewAction::Notify(failure_notice(err));
    }
    match self.creating.data() {
      Some(story) => ViewAction::Batch(vec![
        ViewAction::Notify(Notice::success(format!("\"{}\" is ready!", story.title))),
        ViewAction::Replace(Box::new(StoryDetailView::with_story(
          self.services.clone(),
          story.clone(),
        ))),
      ]),
      None => ViewAction::None,
    }
  }

  fn is_editing(&self) -> bool {
    self.editing || self.picker.is_active()
  }

  fn on_gate(&mut self, action: GatedAction) -> ViewAction {
    if let GatedAction::Generate(request) = action {
      let creator = self.services.creator.clone();
      self
        .creating
        .dispatch(async move { creator.create(request).await });
    }
    ViewAction::None
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![
      ShortcutInfo::new("j/k", "field").with_priority(10),
      ShortcutInfo::new("enter", "edit / choose").with_priority(20),
      ShortcutInfo::new("esc", "done").when_active(),
      ShortcutInfo::new("q", "back").with_priority(90),
    ]
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::api::fake::{topic, user, FakeApi};
  use crate::api::ApiError;
  use crate::services::testing::services;
  use crossterm::event::KeyModifiers;
  use std::sync::Arc;
  use std::time::Duration;

  fn key(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
  }

  async fn logged_in(fake: FakeApi) -> (StoryCreateView, Arc<FakeApi>) {
    let fake = Arc::new(fake.with_user(user(2)).with_topics(vec![topic("doga", "Doğa")]));
    let services = services(fake.clone());
    services.store.set_token("tok").unwrap();
    services.auth.boot().await;
    (StoryCreateView::new(services, Some("doga".into()), None), fake)
  }

  fn fill(view: &mut StoryCreateView) {
    view.theme.set_value("paylaşmak");
    view.form.age_group = Some(AgeGroup::SixToSeven);
    view.row = ROWS.len() - 1;
  }

  #[tokio::test]
  async fn test_missing_fields_never_reach_backend() {
    let (mut view, fake) = logged_in(FakeApi::new()).await;
    view.row = ROWS.len() - 1;
    assert!(matches!(view.handle_key(key(KeyCode::Enter)), ViewAction::Notify(_)));
    assert_eq!(fake.calls("generate_story"), 0);
  }

  #[tokio::test]
  async fn test_submit_is_gated_then_opens_story() {
    let (mut view, fake) = logged_in(FakeApi::new()).await;
    fill(&mut view);

    let ViewAction::Gate(action) = view.handle_key(key(KeyCode::Enter)) else {
      panic!("generation should be gated");
    };
    assert_eq!(fake.calls("generate_story"), 0);

    view.on_gate(action);
    tokio::time::sleep(Duration::from_millis(30)).await;
    let ViewAction::Batch(actions) = view.tick() else {
      panic!("success should notify and open the story");
    };
    assert!(matches!(actions.last(), Some(ViewAction::Replace(_))));
    assert_eq!(fake.last_generate().map(|r| r.age_group), Some("6-7".to_string()));
  }

  #[tokio::test]
  async fn test_insufficient_credits_notice_links_to_profile() {
    let (mut view, _) = logged_in(FakeApi::new().failing(
      "generate_story",
      ApiError::InsufficientCredits {
        detail: "Yetersiz kredi".into(),
      },
    ))
    .await;
    fill(&mut view);
    let ViewAction::Gate(action) = view.handle_key(key(KeyCode::Enter)) else {
      panic!("generation should be gated");
    };
    view.on_gate(action);
    tokio::time::sleep(Duration::from_millis(30)).await;
    let ViewAction::Notify(notice) = view.tick() else {
      panic!("failure should notify");
    };
    assert_eq!(notice.link, Some(NoticeLink::Profile));
  }

  #[tokio::test]
  async fn test_leaving_mid_generation_hands_it_over() {
    let (mut view, fake) =
      logged_in(FakeApi::new().delayed("generate_story", Duration::from_millis(40))).await;
    fill(&mut view);
    let ViewAction::Gate(action) = view.handle_key(key(KeyCode::Enter)) else {
      panic!("generation should be gated");
    };
    view.on_gate(action);
    assert!(view.creating.is_loading());

    let ViewAction::Batch(actions) = view.handle_key(key(KeyCode::Char('q'))) else {
      panic!("leaving should hand over the generation");
    };
    let [ViewAction::Detach(mut creating), ViewAction::Notify(_), ViewAction::Pop] =
      <[ViewAction; 3]>::try_from(actions).ok().unwrap()
    else {
      panic!("expected detach, notice, pop");
    };

    tokio::time::sleep(Duration::from_millis(80)).await;
    assert!(creating.poll());
    assert!(creating.data().is_some());
    assert_eq!(fake.calls("generate_story"), 1);
  }

  #[tokio::test]
  async fn test_anonymous_submit_asks_for_login() {
    let fake = Arc::new(FakeApi::new());
    let mut view = StoryCreateView::new(services(fake.clone()), Some("doga".into()), None);
    fill(&mut view);
    let ViewAction::Notify(notice) = view.handle_key(key(KeyCode::Enter)) else {
      panic!("anonymous submit should notify");
    };
    assert_eq!(notice.link, Some(NoticeLink::Login));
    assert_eq!(fake.calls("generate_story"), 0);
  }

  #[tokio::test]
  async fn test_changing_topic_clears_subtopic() {
    let (mut view, fake) = logged_in(FakeApi::new()).await;
    view.form.subtopic_id = Some("paylasma".into());
    view.form.kazanim_based = true;
    view.picker_target = Some(PickerTarget::Topic);
    view.apply_pick("bilim".into());
    assert_eq!(view.form.subtopic_id, None);
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(fake.calls("list_subtopics"), 2);
  }
}
