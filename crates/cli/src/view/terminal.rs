//! Line-oriented front end for the view controller.

use std::io;
use std::path::Path;

use async_trait::async_trait;
use clientela_core::domain::customer::{filter_by_term, Customer};
use clientela_core::domain::photo::{encode_data_url, inspect_data_url, mime_for_path};
use clientela_db::CustomerStore;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, Lines};

use super::controller::{Confirm, View, ViewController};
use super::form::FormField;

const HELP: &str =
    "commands: n (new) | e <n> (edit) | d <n> (delete) | s <term> (search) | r (reload) | q (quit)";

#[derive(Debug, PartialEq, Eq)]
enum ListCommand {
    New,
    Edit(usize),
    Delete(usize),
    Search(String),
    Reload,
    Quit,
    Help,
}

fn parse_command(line: &str) -> ListCommand {
    let line = line.trim();
    let (verb, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
    let rest = rest.trim();
    let position = || rest.parse::<usize>().ok().filter(|n| *n > 0);

    match verb {
        "n" => ListCommand::New,
        "e" => position().map(ListCommand::Edit).unwrap_or(ListCommand::Help),
        "d" => position().map(ListCommand::Delete).unwrap_or(ListCommand::Help),
        "s" => ListCommand::Search(rest.to_string()),
        "r" => ListCommand::Reload,
        "q" => ListCommand::Quit,
        _ => ListCommand::Help,
    }
}

pub struct Terminal<R, W> {
    lines: Lines<R>,
    output: W,
    filter: Option<String>,
}

impl<R, W> Terminal<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    pub fn new(input: R, output: W) -> Self {
        Self { lines: input.lines(), output, filter: None }
    }

    pub fn into_output(self) -> W {
        self.output
    }

    /// Runs until `q` or end of input.
    pub async fn run<S: CustomerStore>(
        &mut self,
        controller: &mut ViewController<S>,
    ) -> io::Result<()> {
        self.write_line("Loading customers...").await?;
        controller.load().await;

        loop {
            let displayed = self.displayed(controller);
            self.render_list(controller, &displayed).await?;

            let Some(line) = self.prompt("> ").await? else {
                break;
            };

            match parse_command(&line) {
                ListCommand::Quit => break,
                ListCommand::Help => self.write_line(HELP).await?,
                ListCommand::Reload => {
                    self.filter = None;
                    controller.load().await;
                }
                ListCommand::Search(term) => {
                    self.filter = (!term.is_empty()).then_some(term);
                }
                ListCommand::New => {
                    controller.new_customer();
                    if !self.run_form(controller).await? {
                        break;
                    }
                }
                ListCommand::Edit(position) => match displayed.get(position - 1) {
                    Some(customer) => {
                        controller.edit(customer);
                        if !self.run_form(controller).await? {
                            break;
                        }
                    }
                    None => self.write_line(&format!("No customer at position {position}")).await?,
                },
                ListCommand::Delete(position) => match displayed.get(position - 1) {
                    Some(customer) => {
                        let id = customer.id.clone();
                        controller.confirm_delete(&id, self).await;
                    }
                    None => self.write_line(&format!("No customer at position {position}")).await?,
                },
            }
        }

        self.output.flush().await
    }

    fn displayed<S: CustomerStore>(&self, controller: &ViewController<S>) -> Vec<Customer> {
        let customers = controller.customers().to_vec();
        match &self.filter {
            Some(term) => filter_by_term(customers, term),
            None => customers,
        }
    }

    async fn render_list<S: CustomerStore>(
        &mut self,
        controller: &ViewController<S>,
        customers: &[Customer],
    ) -> io::Result<()> {
        self.write_line("").await?;
        let heading = match &self.filter {
            Some(term) => format!("{} (search: {term})", controller.title()),
            None => controller.title().to_string(),
        };
        self.write_line(&heading).await?;
        if let Some(error) = controller.error() {
            self.write_line(&format!("! {error}")).await?;
        }

        if customers.is_empty() {
            return self.write_line("No customers registered").await;
        }

        for (index, customer) in customers.iter().enumerate() {
            let photo = match customer.photo.as_deref().and_then(inspect_data_url) {
                Some((mime, size)) => format!("{mime}, {size} bytes"),
                None if customer.photo.is_some() => "attached".to_string(),
                None => "none".to_string(),
            };
            self.write_line(&format!("{}. {} <{}>", index + 1, customer.full_name(), customer.email))
                .await?;
            self.write_line(&format!(
                "   phone: {} | address: {} | photo: {photo}",
                customer.phone, customer.address
            ))
            .await?;
        }
        Ok(())
    }

    /// Prompts for every field until the controller accepts the submit or the
    /// user gives up. Returns `false` when input ran out.
    async fn run_form<S: CustomerStore>(
        &mut self,
        controller: &mut ViewController<S>,
    ) -> io::Result<bool> {
        loop {
            self.write_line("").await?;
            self.write_line(controller.title()).await?;

            for field in FormField::ALL {
                let current = controller.form().get(field).to_string();
                let label = if current.is_empty() {
                    format!("{}: ", field.label())
                } else {
                    format!("{} [{current}]: ", field.label())
                };
                let Some(value) = self.prompt(&label).await? else {
                    controller.cancel();
                    return Ok(false);
                };
                let value = value.trim();
                if !value.is_empty() {
                    controller.set_field(field, value);
                }
            }

            let photo_label = if controller.form().photo.is_some() {
                "Photo file (blank keeps current, - removes): "
            } else {
                "Photo file (blank for none): "
            };
            let Some(photo) = self.prompt(photo_label).await? else {
                controller.cancel();
                return Ok(false);
            };
            match photo.trim() {
                "" => {}
                "-" => controller.set_photo(None),
                path => match read_photo(Path::new(path)).await {
                    Ok(data_url) => controller.set_photo(Some(data_url)),
                    Err(error) => {
                        self.write_line(&format!("! could not read photo `{path}`: {error}"))
                            .await?;
                    }
                },
            }

            let confirm_label = format!("{} or cancel? [Y/c] ", controller.submit_label());
            let Some(answer) = self.prompt(&confirm_label).await? else {
                controller.cancel();
                return Ok(false);
            };
            if answer.trim().eq_ignore_ascii_case("c") {
                controller.cancel();
                return Ok(true);
            }

            controller.submit().await;
            if controller.view() == View::List {
                self.filter = None;
                return Ok(true);
            }
            if let Some(error) = controller.error() {
                let message = format!("! {error}");
                self.write_line(&message).await?;
            }
        }
    }

    async fn write_line(&mut self, text: &str) -> io::Result<()> {
        self.output.write_all(text.as_bytes()).await?;
        self.output.write_all(b"\n").await
    }

    async fn prompt(&mut self, text: &str) -> io::Result<Option<String>> {
        self.output.write_all(text.as_bytes()).await?;
        self.output.flush().await?;
        self.lines.next_line().await
    }
}

#[async_trait]
impl<R, W> Confirm for Terminal<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    async fn confirm(&mut self, prompt: &str) -> bool {
        match self.prompt(&format!("{prompt} [y/N] ")).await {
            Ok(Some(answer)) => {
                matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
            }
            _ => false,
        }
    }
}

async fn read_photo(path: &Path) -> io::Result<String> {
    let bytes = tokio::fs::read(path).await?;
    Ok(encode_data_url(mime_for_path(path), &bytes))
}
