use conference::ConferenceApi;
use conference::config::ConferenceConfig;
use conference::error::ErrorCode;
use conference::identity::Identity;
use conference::model::{ConferenceForm, SessionForm};
use conference::query::RawFilter;

fn organizer() -> Identity {
    Identity::new("organizer", "org@example.com", "Organizer")
}

async fn create(api: &ConferenceApi, name: &str, city: &str, seats: i64, topics: &[&str]) -> String {
    api.create_conference(
        Some(&organizer()),
        ConferenceForm {
            name: Some(name.into()),
            city: Some(city.into()),
            max_attendees: Some(seats),
            topics: topics.iter().map(|t| t.to_string()).collect(),
            start_date: Some("2016-06-01".into()),
            ..ConferenceForm::default()
        },
    )
    .await
    .expect("create")
    .websafe_key
}

async fn seeded() -> ConferenceApi {
    let (api, _tasks) = ConferenceApi::in_memory(ConferenceConfig::development()).expect("api");
    create(&api, "Delta", "London", 40, &["Web"]).await;
    create(&api, "Alpha", "London", 10, &["Rust", "Web"]).await;
    create(&api, "Charlie", "Paris", 25, &["Rust"]).await;
    create(&api, "Bravo", "London", 25, &["Go"]).await;
    api
}

fn names(views: &[conference::model::ConferenceView]) -> Vec<&str> {
    views.iter().map(|view| view.name.as_str()).collect()
}

#[tokio::test]
async fn equality_only_results_are_ordered_by_name() {
    let api = seeded().await;
    let found = api
        .query_conferences(&[RawFilter::new("CITY", "EQ", "London")])
        .await
        .expect("query");
    assert_eq!(names(&found), vec!["Alpha", "Bravo", "Delta"]);

    let all = api.query_conferences(&[]).await.expect("all");
    assert_eq!(names(&all), vec!["Alpha", "Bravo", "Charlie", "Delta"]);
}

#[tokio::test]
async fn inequality_field_sorts_before_name() {
    let api = seeded().await;
    let found = api
        .query_conferences(&[
            RawFilter::new("CITY", "EQ", "London"),
            RawFilter::new("MAX_ATTENDEES", "GT", "5"),
        ])
        .await
        .expect("query");
    assert_eq!(names(&found), vec!["Alpha", "Bravo", "Delta"]);

    let found = api
        .query_conferences(&[RawFilter::new("MAX_ATTENDEES", "GTEQ", "25")])
        .await
        .expect("query");
    assert_eq!(names(&found), vec!["Bravo", "Charlie", "Delta"]);
}

#[tokio::test]
async fn topic_equality_matches_any_list_element() {
    let api = seeded().await;
    let found = api
        .query_conferences(&[RawFilter::new("TOPIC", "EQ", "Rust")])
        .await
        .expect("query");
    assert_eq!(names(&found), vec!["Alpha", "Charlie"]);

    let found = api
        .query_conferences(&[
            RawFilter::new("MONTH", "EQ", "6"),
            RawFilter::new("TOPIC", "EQ", "Web"),
        ])
        .await
        .expect("query");
    assert_eq!(names(&found), vec!["Alpha", "Delta"]);
}

#[tokio::test]
async fn a_second_inequality_field_is_rejected() {
    let api = seeded().await;
    let err = api
        .query_conferences(&[
            RawFilter::new("MAX_ATTENDEES", "GT", "5"),
            RawFilter::new("CITY", "NE", "Paris"),
        ])
        .await
        .expect_err("two inequality fields");
    assert_eq!(err.code(), ErrorCode::InvalidArgument);
    assert!(err.to_string().contains("inequality filter allowed on only one field"));

    // Two bounds on the same field are a range, not a second field.
    let found = api
        .query_conferences(&[
            RawFilter::new("MAX_ATTENDEES", "GT", "10"),
            RawFilter::new("MAX_ATTENDEES", "LT", "40"),
        ])
        .await
        .expect("range");
    assert_eq!(names(&found), vec!["Bravo", "Charlie"]);
}

#[tokio::test]
async fn unknown_fields_operators_and_values_are_rejected() {
    let api = seeded().await;
    for criterion in [
        RawFilter::new("SPEAKER", "EQ", "x"),
        RawFilter::new("CITY", "LIKE", "x"),
        RawFilter::new("MAX_ATTENDEES", "GT", "many"),
    ] {
        let err = api
            .query_conferences(&[criterion.clone()])
            .await
            .expect_err("rejected");
        assert_eq!(err.code(), ErrorCode::InvalidArgument, "{criterion:?}");
    }
}

#[tokio::test]
async fn session_filters_order_by_start_time() {
    let (api, _tasks) = ConferenceApi::in_memory(ConferenceConfig::development()).expect("api");
    let conf = create(&api, "RustConf", "Portland", 100, &["Rust"]).await;
    for (name, kind, start, duration) in [
        ("Keynote", "keynote", "09:00", 60),
        ("Macros", "workshop", "13:30", 120),
        ("Traits", "lecture", "11:00", 45),
        ("Unsafe", "lecture", "16:00", 45),
    ] {
        api.create_session(
            Some(&organizer()),
            &conf,
            SessionForm {
                name: Some(name.into()),
                type_of_session: Some(kind.into()),
                start_time: Some(start.into()),
                duration: Some(duration),
                speaker: Some("Grace".into()),
                ..SessionForm::default()
            },
        )
        .await
        .expect("session");
    }

    let lectures = api
        .get_sessions_with_filters(&[RawFilter::new("TYPEOFSESSION", "EQ", "lecture")])
        .await
        .expect("lectures");
    let found: Vec<&str> = lectures.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(found, vec!["Traits", "Unsafe"]);
    assert_eq!(lectures[0].start_time.as_deref(), Some("11:00"));

    let short = api
        .get_sessions_with_filters(&[RawFilter::new("DURATION", "LTEQ", "60")])
        .await
        .expect("short");
    let found: Vec<&str> = short.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(found, vec!["Traits", "Unsafe", "Keynote"]);

    let by_type = api
        .get_conference_sessions_by_type(&conf, "workshop")
        .await
        .expect("by type");
    assert_eq!(by_type.len(), 1);
    assert_eq!(by_type[0].name, "Macros");

    assert_eq!(api.get_sessions_by_speaker("Grace").await.expect("speaker").len(), 4);
    assert!(api.get_sessions_by_speaker("Linus").await.expect("speaker").is_empty());
    assert_eq!(api.get_conference_sessions(&conf).await.expect("all").len(), 4);
}

#[tokio::test]
async fn sessions_without_a_start_time_are_still_found() {
    let (api, _tasks) = ConferenceApi::in_memory(ConferenceConfig::development()).expect("api");
    let conf = create(&api, "RustConf", "Portland", 100, &["Rust"]).await;
    for (name, start) in [("Late", Some("15:00")), ("Unscheduled", None), ("Early", Some("08:30"))] {
        api.create_session(
            Some(&organizer()),
            &conf,
            SessionForm {
                name: Some(name.into()),
                type_of_session: Some("Workshop".into()),
                start_time: start.map(str::to_string),
                duration: Some(90),
                ..SessionForm::default()
            },
        )
        .await
        .expect("session");
    }

    let by_type = api
        .get_conference_sessions_by_type(&conf, "Workshop")
        .await
        .expect("by type");
    let filtered = api
        .get_sessions_with_filters(&[RawFilter::new("TYPEOFSESSION", "EQ", "Workshop")])
        .await
        .expect("filtered");
    assert_eq!(filtered.len(), by_type.len());
    let found: Vec<&str> = filtered.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(found, vec!["Unscheduled", "Early", "Late"]);

    let post_filtered = api
        .get_sessions_two_inequality(&[
            RawFilter::new("TYPEOFSESSION", "EQ", "Workshop"),
            RawFilter::new("DURATION", "GTEQ", "60"),
        ])
        .await
        .expect("two inequality");
    assert_eq!(post_filtered.len(), 3);
}
