//! Record types shared by the integration tests.

#![allow(dead_code)]

use jsonapi::{Link, Links, Model, Schema};
use serde_json::Value;

#[derive(Debug, Default, Clone, PartialEq)]
pub struct User {
    pub id: String,
    pub name: String,
}

impl Model for User {
    fn schema() -> Schema<Self> {
        Schema::<Self>::new("users")
            .id(|u| &u.id, |u| &mut u.id)
            .attribute("name", |u| &u.name, |u| &mut u.name)
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Comment {
    pub id: u64,
    pub body: String,
    pub author: Option<User>,
}

impl Model for Comment {
    fn schema() -> Schema<Self> {
        Schema::<Self>::new("comments")
            .id(|c| &c.id, |c| &mut c.id)
            .attribute("body", |c| &c.body, |c| &mut c.body)
            .to_one("author", |c| &c.author, |c| &mut c.author)
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Stamps {
    pub created: String,
    pub updated: String,
}

fn stamps_schema() -> Schema<Stamps> {
    Schema::<Stamps>::new("")
        .attribute("created", |s| &s.created, |s| &mut s.created)
        .read_only()
        .attribute("updated", |s| &s.updated, |s| &mut s.updated)
        .omit_empty()
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Article {
    pub id: String,
    pub title: String,
    pub views: u32,
    pub published: bool,
    pub rating: Option<f64>,
    pub extra: Value,
    pub author: Option<User>,
    pub comments: Vec<Comment>,
    pub tag_ids: Vec<String>,
    pub stamps: Stamps,
}

impl Model for Article {
    fn schema() -> Schema<Self> {
        Schema::<Self>::new("articles")
            .id(|a| &a.id, |a| &mut a.id)
            .attribute("title", |a| &a.title, |a| &mut a.title)
            .attribute("views", |a| &a.views, |a| &mut a.views)
            .attribute("published", |a| &a.published, |a| &mut a.published)
            .attribute("rating", |a| &a.rating, |a| &mut a.rating)
            .omit_empty()
            .attribute("extra", |a| &a.extra, |a| &mut a.extra)
            .omit_empty()
            .to_one("author", |a| &a.author, |a| &mut a.author)
            .to_many("comments", |a| &a.comments, |a| &mut a.comments)
            .to_many_ids("tags", "tags", |a| &a.tag_ids, |a| &mut a.tag_ids)
            .omit_empty()
            .links_only("history")
            .embed(|a| &a.stamps, |a| &mut a.stamps, stamps_schema())
    }

    fn links(&self) -> Option<Links> {
        let mut links = Links::new();
        links.insert("canonical".into(), Link::new(format!("/a/{}", self.id)));
        Some(links)
    }

    fn relationship_links(&self, name: &str) -> Option<Links> {
        if name != "history" {
            return None;
        }
        let mut links = Links::new();
        links.insert(
            "related".into(),
            Link::new(format!("/articles/{}/history", self.id)),
        );
        Some(links)
    }
}

pub fn user(id: &str, name: &str) -> User {
    User {
        id: id.into(),
        name: name.into(),
    }
}

pub fn comment(id: u64, body: &str, author: Option<User>) -> Comment {
    Comment {
        id,
        body: body.into(),
        author,
    }
}

pub fn article(id: &str, title: &str) -> Article {
    Article {
        id: id.into(),
        title: title.into(),
        ..Default::default()
    }
}

pub fn to_value(bytes: &[u8]) -> Value {
    serde_json::from_slice(bytes).unwrap()
}
