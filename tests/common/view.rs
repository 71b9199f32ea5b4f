use thaiquest::quiz::view::{ChoiceView, Feedback, QuizView, RenderError, RoundView, StatsLine};

#[derive(Debug, Default)]
pub struct RecordingView {
    pub missing: Vec<&'static str>,
    pub rounds: Vec<RoundView>,
    pub choice_updates: Vec<Vec<ChoiceView>>,
    pub feedback: Vec<Feedback>,
    pub no_data: Vec<String>,
    pub stats: Vec<StatsLine>,
    pub restart_visible: Option<bool>,
}

impl RecordingView {
    pub fn last_round(&self) -> &RoundView {
        self.rounds.last().expect("a rendered round")
    }

    pub fn last_stats(&self) -> StatsLine {
        *self.stats.last().expect("a stats update")
    }

    pub fn last_feedback(&self) -> Option<&Feedback> {
        self.feedback.last()
    }
}

impl QuizView for RecordingView {
    fn missing_anchors(&self) -> Vec<&'static str> {
        self.missing.clone()
    }

    fn render_round(&mut self, round: &RoundView) -> Result<(), RenderError> {
        self.rounds.push(round.clone());
        Ok(())
    }

    fn update_choices(&mut self, choices: &[ChoiceView]) -> Result<(), RenderError> {
        self.choice_updates.push(choices.to_vec());
        Ok(())
    }

    fn show_feedback(&mut self, feedback: &Feedback) -> Result<(), RenderError> {
        self.feedback.push(feedback.clone());
        Ok(())
    }

    fn show_no_data(&mut self, message: &str) -> Result<(), RenderError> {
        self.no_data.push(message.to_string());
        Ok(())
    }

    fn update_stats(&mut self, stats: &StatsLine) -> Result<(), RenderError> {
        self.stats.push(*stats);
        Ok(())
    }

    fn set_restart_visible(&mut self, visible: bool) -> Result<(), RenderError> {
        self.restart_visible = Some(visible);
        Ok(())
    }
}
