use chrono::NaiveDate;
use event_logistics::db::{Database, PeopleFilter, SessionFilter, StoreError};
use event_logistics::models::*;
use speculate2::speculate;
use uuid::Uuid;

fn create_test_event(db: &Database) -> Event {
    db.create_event(CreateEventInput {
        name: "Annual Summit".to_string(),
        timezone: "Europe/Paris".to_string(),
        start_date: NaiveDate::from_ymd_opt(2025, 9, 17).unwrap(),
        end_date: NaiveDate::from_ymd_opt(2025, 9, 18).unwrap(),
        branding: None,
    })
    .expect("Failed to create event")
}

fn session_input(code: &str, start: &str, end: &str, capacity: Option<u32>) -> CreateSessionInput {
    CreateSessionInput {
        code: code.to_string(),
        title: format!("Session {code}"),
        kind: SessionKind::Workshop,
        description: None,
        day: "2025-09-17".to_string(),
        start: format!("2025-09-17T{start}:00+02:00").parse().unwrap(),
        end: format!("2025-09-17T{end}:00+02:00").parse().unwrap(),
        location: None,
        capacity,
    }
}

fn create_test_session(
    db: &Database,
    event: &Event,
    code: &str,
    start: &str,
    end: &str,
) -> Session {
    db.create_session(event.id, session_input(code, start, end, None))
        .expect("Failed to create session")
}

fn create_test_group(db: &Database, event: &Event, code: &str) -> Group {
    db.create_group(
        event.id,
        CreateGroupInput {
            code: code.to_string(),
            name: format!("Group {code}"),
            color: None,
            description: None,
        },
    )
    .expect("Failed to create group")
}

fn include_rule(sessions: &[&Session], priority: i32) -> CreateRuleInput {
    CreateRuleInput {
        kind: RuleType::Include,
        session_ids: sessions.iter().map(|s| s.id).collect(),
        priority,
        quota: None,
    }
}

fn person_row(first_name: &str, email: &str) -> ImportPersonInput {
    ImportPersonInput {
        first_name: first_name.to_string(),
        last_name: "Martin".to_string(),
        email: Some(email.to_string()),
        ..Default::default()
    }
}

fn train(number: &str) -> TravelLeg {
    TravelLeg {
        mode: "train".to_string(),
        number: Some(number.to_string()),
        date: Some("2025-09-17".to_string()),
        time: Some("08:12".to_string()),
        from: Some("Lyon".to_string()),
        to: Some("Paris".to_string()),
    }
}

/// Import people into the event and return them in import order.
fn import_people(db: &Database, event: &Event, rows: Vec<ImportPersonInput>) -> Vec<Person> {
    db.import_people(event.id, ImportPeopleInput { people: rows }, "test")
        .expect("Failed to import people");
    db.get_event_people(event.id, &PeopleFilter::default()).expect("Query failed")
}

fn store_error(err: &anyhow::Error) -> &StoreError {
    err.downcast_ref::<StoreError>().expect("Expected a store error")
}

speculate! {
    before {
        let db = Database::open_memory().expect("Failed to create in-memory database");
        db.migrate().expect("Failed to run migrations");
    }

    describe "events" {
        it "creates an event and reads it back" {
            let event = create_test_event(&db);

            let found = db.get_event(event.id).expect("Query failed").unwrap();
            assert_eq!(found.name, "Annual Summit");
            assert_eq!(found.timezone, "Europe/Paris");
            assert_eq!(found.start_date, NaiveDate::from_ymd_opt(2025, 9, 17).unwrap());
        }

        it "rejects an event ending before it starts" {
            let err = db.create_event(CreateEventInput {
                name: "Backwards".to_string(),
                timezone: "UTC".to_string(),
                start_date: NaiveDate::from_ymd_opt(2025, 9, 18).unwrap(),
                end_date: NaiveDate::from_ymd_opt(2025, 9, 17).unwrap(),
                branding: None,
            }).unwrap_err();

            assert!(matches!(
                store_error(&err),
                StoreError::Validation(ValidationError::EventEndsBeforeStart)
            ));
        }

        it "returns None for a non-existent event" {
            assert!(db.get_event(Uuid::new_v4()).expect("Query failed").is_none());
            assert!(db.get_event_summary(Uuid::new_v4()).expect("Query failed").is_none());
        }

        it "counts sessions, groups and participants in the summary" {
            let event = create_test_event(&db);
            create_test_session(&db, &event, "S1", "09:00", "10:00");
            create_test_group(&db, &event, "VIP");
            import_people(&db, &event, vec![
                person_row("Alice", "alice@example.com"),
                person_row("Bob", "bob@example.com"),
            ]);

            let summary = db.get_event_summary(event.id).expect("Query failed").unwrap();
            assert_eq!(summary.counts, EventCounts { sessions: 1, groups: 1, participants: 2 });
        }
    }

    describe "sessions" {
        it "fails when the event does not exist" {
            let err = db
                .create_session(Uuid::new_v4(), session_input("S1", "09:00", "10:00", None))
                .unwrap_err();
            assert!(matches!(store_error(&err), StoreError::NotFound("Event")));
        }

        it "rejects a session ending before it starts" {
            let event = create_test_event(&db);
            let err = db
                .create_session(event.id, session_input("S1", "10:00", "09:00", None))
                .unwrap_err();
            assert!(matches!(
                store_error(&err),
                StoreError::Validation(ValidationError::EndBeforeStart)
            ));
        }

        it "lists sessions by start time then code" {
            let event = create_test_event(&db);
            create_test_session(&db, &event, "WS-B", "11:00", "12:00");
            create_test_session(&db, &event, "PLE", "09:00", "10:00");
            create_test_session(&db, &event, "WS-A", "11:00", "12:00");

            let codes: Vec<String> = db
                .get_event_sessions(event.id, &SessionFilter::default())
                .expect("Query failed")
                .into_iter()
                .map(|s| s.code)
                .collect();
            assert_eq!(codes, vec!["PLE", "WS-A", "WS-B"]);
        }

        it "filters sessions by day and type" {
            let event = create_test_event(&db);
            create_test_session(&db, &event, "WS-A", "11:00", "12:00");
            let mut bus = session_input("BUS", "07:00", "08:00", None);
            bus.kind = SessionKind::Transport;
            bus.day = "2025-09-18".to_string();
            db.create_session(event.id, bus).expect("Failed to create session");

            let on_day = db.get_event_sessions(event.id, &SessionFilter {
                day: Some("2025-09-18".to_string()),
                kind: None,
            }).expect("Query failed");
            assert_eq!(on_day.len(), 1);
            assert_eq!(on_day[0].code, "BUS");

            let workshops = db.get_event_sessions(event.id, &SessionFilter {
                day: None,
                kind: Some(SessionKind::Workshop),
            }).expect("Query failed");
            assert_eq!(workshops.len(), 1);
            assert_eq!(workshops[0].code, "WS-A");
        }

        it "updates only the given fields" {
            let event = create_test_event(&db);
            let session = create_test_session(&db, &event, "S1", "09:00", "10:00");

            let updated = db.update_session(session.id, UpdateSessionInput {
                capacity: Some(Some(25)),
                location: Some(Some("Room 2".to_string())),
                ..Default::default()
            }).expect("Update failed").unwrap();

            assert_eq!(updated.code, "S1");
            assert_eq!(updated.capacity, Some(25));
            assert_eq!(db.get_session(session.id).expect("Query failed").unwrap(), updated);
        }

        it "clears the capacity back to unlimited" {
            let event = create_test_event(&db);
            let session = db
                .create_session(event.id, session_input("S1", "09:00", "10:00", Some(30)))
                .expect("Failed to create session");

            let updated = db.update_session(session.id, UpdateSessionInput {
                capacity: Some(None),
                ..Default::default()
            }).expect("Update failed").unwrap();

            assert_eq!(updated.capacity, None);
            assert_eq!(db.get_session(session.id).expect("Query failed").unwrap().capacity, None);
        }

        it "returns None when updating a missing session" {
            let result = db
                .update_session(Uuid::new_v4(), UpdateSessionInput::default())
                .expect("Update failed");
            assert!(result.is_none());
        }
    }

    describe "groups and rules" {
        it "lists groups ordered by code" {
            let event = create_test_event(&db);
            create_test_group(&db, &event, "STAFF");
            create_test_group(&db, &event, "GUEST");

            let codes: Vec<String> = db
                .get_event_groups(event.id)
                .expect("Query failed")
                .into_iter()
                .map(|g| g.code)
                .collect();
            assert_eq!(codes, vec!["GUEST", "STAFF"]);
        }

        it "stores a rule with its sessions" {
            let event = create_test_event(&db);
            let group = create_test_group(&db, &event, "VIP");
            let s1 = create_test_session(&db, &event, "S1", "09:00", "10:00");
            let s2 = create_test_session(&db, &event, "S2", "11:00", "12:00");

            let rule = db.create_rule(group.id, include_rule(&[&s1, &s2], 90)).expect("Failed to create rule");

            let rules = db.get_group_rules(group.id).expect("Query failed");
            assert_eq!(rules.len(), 1);
            assert_eq!(rules[0].id, rule.id);
            assert_eq!(rules[0].kind, RuleType::Include);
            assert_eq!(rules[0].session_ids, vec![s1.id, s2.id]);
        }

        it "rejects a rule without sessions" {
            let event = create_test_event(&db);
            let group = create_test_group(&db, &event, "VIP");

            let err = db.create_rule(group.id, include_rule(&[], 90)).unwrap_err();
            assert!(matches!(
                store_error(&err),
                StoreError::Validation(ValidationError::Empty("session_ids"))
            ));
        }

        it "rejects a priority above 100" {
            let event = create_test_event(&db);
            let group = create_test_group(&db, &event, "VIP");
            let s1 = create_test_session(&db, &event, "S1", "09:00", "10:00");

            let err = db.create_rule(group.id, include_rule(&[&s1], 101)).unwrap_err();
            assert!(matches!(
                store_error(&err),
                StoreError::Validation(ValidationError::PriorityOutOfRange(101))
            ));
        }

        it "fails when the group does not exist" {
            let err = db.create_rule(Uuid::new_v4(), include_rule(&[], 10)).unwrap_err();
            // Validation runs before the lookup
            assert!(matches!(store_error(&err), StoreError::Validation(_)));

            let s = Uuid::new_v4();
            let err = db.create_rule(Uuid::new_v4(), CreateRuleInput {
                kind: RuleType::Exclude,
                session_ids: vec![s],
                priority: 10,
                quota: None,
            }).unwrap_err();
            assert!(matches!(store_error(&err), StoreError::NotFound("Group")));
        }
    }

    describe "people import" {
        it "creates new participants" {
            let event = create_test_event(&db);

            let summary = db.import_people(event.id, ImportPeopleInput {
                people: vec![person_row("Alice", "alice@example.com"), person_row("Bob", "bob@example.com")],
            }, "import").expect("Import failed");

            assert_eq!(summary, ImportSummary { created: 2, updated: 0, skipped: 0 });
            let names: Vec<String> = db.get_event_people(event.id, &PeopleFilter::default()).expect("Query failed")
                .into_iter().map(|p| p.first_name).collect();
            assert_eq!(names, vec!["Alice", "Bob"]);
        }

        it "updates a participant matched by email" {
            let event = create_test_event(&db);
            import_people(&db, &event, vec![person_row("Alice", "alice@example.com")]);

            let mut row = person_row("Alicia", "alice@example.com");
            row.company = Some("Acme".to_string());
            let summary = db.import_people(event.id, ImportPeopleInput { people: vec![row] }, "import")
                .expect("Import failed");

            assert_eq!(summary, ImportSummary { created: 0, updated: 1, skipped: 0 });
            let people = db.get_event_people(event.id, &PeopleFilter::default()).expect("Query failed");
            assert_eq!(people.len(), 1);
            assert_eq!(people[0].first_name, "Alicia");
            assert_eq!(people[0].company.as_deref(), Some("Acme"));
        }

        it "matches by phone and external id" {
            let event = create_test_event(&db);
            let mut by_phone = person_row("Carol", "carol@example.com");
            by_phone.phone = Some("+33600000000".to_string());
            let mut by_external = person_row("Dan", "dan@example.com");
            by_external.external_id = Some("CRM-42".to_string());
            import_people(&db, &event, vec![by_phone, by_external]);

            let mut phone_row = person_row("Carol", "carol@other.example.com");
            phone_row.phone = Some("+33600000000".to_string());
            let mut external_row = person_row("Daniel", "daniel@other.example.com");
            external_row.external_id = Some("CRM-42".to_string());
            let summary = db.import_people(event.id, ImportPeopleInput {
                people: vec![phone_row, external_row],
            }, "import").expect("Import failed");

            assert_eq!(summary, ImportSummary { created: 0, updated: 2, skipped: 0 });
        }

        it "replaces memberships when a row lists groups" {
            let event = create_test_event(&db);
            let vip = create_test_group(&db, &event, "VIP");
            let mut row = person_row("Alice", "alice@example.com");
            row.memberships = Some(vec![vip.id]);

            let people = import_people(&db, &event, vec![row]);

            assert_eq!(db.get_person_memberships(people[0].id).expect("Query failed"), vec![vip.id]);
            let members = db.get_event_people(event.id, &PeopleFilter { group: Some(vip.id), missing: None }).expect("Query failed");
            assert_eq!(members.len(), 1);
        }

        it "skips rows that change nothing" {
            let event = create_test_event(&db);
            import_people(&db, &event, vec![person_row("Alice", "alice@example.com")]);

            let summary = db.import_people(event.id, ImportPeopleInput {
                people: vec![person_row("Alice", "alice@example.com")],
            }, "import").expect("Import failed");

            assert_eq!(summary, ImportSummary { created: 0, updated: 0, skipped: 1 });
        }

        it "stores profile sections" {
            let event = create_test_event(&db);
            let mut row = person_row("Alice", "alice@example.com");
            row.diet = Some(Diet { allergens: Some(vec!["peanuts".to_string()]), preferences: None });
            row.transport = Some(Transport { arrival: Some(train("TGV 6601")), departure: None });
            row.accommodation = Some(Accommodation {
                hotel: Some("Hilton".to_string()),
                ..Default::default()
            });
            row.accessibility = Some("Wheelchair".to_string());

            let alice = import_people(&db, &event, vec![row.clone()]).remove(0);

            assert_eq!(alice.diet, row.diet);
            assert_eq!(alice.transport, row.transport);
            assert_eq!(alice.accommodation, row.accommodation);
            assert_eq!(alice.accessibility.as_deref(), Some("Wheelchair"));
            assert!(alice.preferences.is_none());
        }

        it "merges profile sections one level deep" {
            let event = create_test_event(&db);
            let mut first = person_row("Alice", "alice@example.com");
            first.accommodation = Some(Accommodation {
                hotel: Some("Hilton".to_string()),
                room: Some("204".to_string()),
                ..Default::default()
            });
            import_people(&db, &event, vec![first]);

            let mut second = person_row("Alice", "alice@example.com");
            second.accommodation = Some(Accommodation {
                room: Some("310".to_string()),
                ..Default::default()
            });
            second.diet = Some(Diet { allergens: None, preferences: Some(vec!["vegan".to_string()]) });
            let alice = import_people(&db, &event, vec![second]).remove(0);

            let accommodation = alice.accommodation.unwrap();
            assert_eq!(accommodation.hotel.as_deref(), Some("Hilton"));
            assert_eq!(accommodation.room.as_deref(), Some("310"));
            assert_eq!(alice.diet.unwrap().preferences, Some(vec!["vegan".to_string()]));
        }

        it "applies nothing when a row is invalid" {
            let event = create_test_event(&db);
            let err = db.import_people(event.id, ImportPeopleInput {
                people: vec![person_row("Alice", "alice@example.com"), person_row("", "nobody@example.com")],
            }, "import").unwrap_err();

            assert!(matches!(store_error(&err), StoreError::Validation(ValidationError::Empty("first_name"))));
            assert!(db.get_event_people(event.id, &PeopleFilter::default()).expect("Query failed").is_empty());
        }

        it "records who imported each participant" {
            let event = create_test_event(&db);
            let people = import_people(&db, &event, vec![person_row("Alice", "alice@example.com")]);

            let logs = db.get_audit_logs(Some(people[0].id)).expect("Query failed");
            assert_eq!(logs.len(), 1);
            assert_eq!(logs[0].action, "people.create");
            assert_eq!(logs[0].actor, "test");
        }
    }

    describe "people" {
        it "updates a person and audits the change" {
            let event = create_test_event(&db);
            let people = import_people(&db, &event, vec![person_row("Alice", "alice@example.com")]);

            let updated = db.update_person(people[0].id, UpdatePersonInput {
                role: Some(Some("Speaker".to_string())),
                ..Default::default()
            }, "ops-lead").expect("Update failed").unwrap();

            assert_eq!(updated.role.as_deref(), Some("Speaker"));
            let logs = db.get_audit_logs(Some(people[0].id)).expect("Query failed");
            assert_eq!(logs[0].action, "people.update");
            assert_eq!(logs[0].actor, "ops-lead");
            assert!(logs[0].before.is_some());
        }

        it "merges profile updates and clears nulled fields" {
            let event = create_test_event(&db);
            let mut row = person_row("Alice", "alice@example.com");
            row.company = Some("Acme".to_string());
            row.transport = Some(Transport { arrival: Some(train("TGV 6601")), departure: None });
            let alice = import_people(&db, &event, vec![row]).remove(0);

            let updated = db.update_person(alice.id, UpdatePersonInput {
                company: Some(None),
                transport: Some(Transport { arrival: None, departure: Some(train("TGV 6650")) }),
                ..Default::default()
            }, "test").expect("Update failed").unwrap();

            assert_eq!(updated.company, None);
            let transport = updated.transport.unwrap();
            assert_eq!(transport.arrival, Some(train("TGV 6601")));
            assert_eq!(transport.departure, Some(train("TGV 6650")));
            assert_eq!(db.get_person(alice.id).expect("Query failed").unwrap().company, None);
        }

        it "filters people missing allergens or transport" {
            let event = create_test_event(&db);
            let mut alice = person_row("Alice", "alice@example.com");
            alice.diet = Some(Diet { allergens: Some(vec!["gluten".to_string()]), preferences: None });
            let mut bob = person_row("Bob", "bob@example.com");
            bob.transport = Some(Transport { arrival: Some(train("TGV 6601")), departure: None });
            let people = import_people(&db, &event, vec![alice, bob]);

            let without_allergens = db.get_event_people(event.id, &PeopleFilter {
                group: None,
                missing: Some(MissingInfo::Allergens),
            }).expect("Query failed");
            let without_transport = db.get_event_people(event.id, &PeopleFilter {
                group: None,
                missing: Some(MissingInfo::Transport),
            }).expect("Query failed");

            assert_eq!(without_allergens.len(), 1);
            assert_eq!(without_allergens[0].id, people[1].id);
            assert_eq!(without_transport.len(), 1);
            assert_eq!(without_transport[0].id, people[0].id);
        }

        it "returns details with memberships and enrollments" {
            let event = create_test_event(&db);
            let vip = create_test_group(&db, &event, "VIP");
            let s1 = create_test_session(&db, &event, "S1", "09:00", "10:00");
            let people = import_people(&db, &event, vec![person_row("Alice", "alice@example.com")]);
            let alice = people[0].id;
            db.set_person_memberships(alice, SetMembershipsInput { group_ids: vec![vip.id] }, "test")
                .expect("Failed to set memberships");
            db.set_enrollment(alice, s1.id, SetEnrollmentInput {
                status: EnrollmentStatus::Assigned,
                priority: None,
                source: None,
            }, "test").expect("Failed to set enrollment");

            let details = db.get_person_details(alice).expect("Query failed").unwrap();
            assert_eq!(details.person.first_name, "Alice");
            assert_eq!(details.memberships, vec![vip.id]);
            assert_eq!(details.enrollments.len(), 1);
            assert_eq!(details.enrollments[0].session_id, s1.id);
        }
    }

    describe "memberships" {
        it "replaces the full set of groups" {
            let event = create_test_event(&db);
            let vip = create_test_group(&db, &event, "VIP");
            let staff = create_test_group(&db, &event, "STAFF");
            let alice = import_people(&db, &event, vec![person_row("Alice", "alice@example.com")])[0].id;

            db.set_person_memberships(alice, SetMembershipsInput { group_ids: vec![vip.id] }, "test")
                .expect("Failed to set memberships");
            let found = db.set_person_memberships(alice, SetMembershipsInput { group_ids: vec![staff.id] }, "test")
                .expect("Failed to set memberships");

            assert!(found);
            assert_eq!(db.get_person_memberships(alice).expect("Query failed"), vec![staff.id]);
        }

        it "returns false for an unknown person" {
            let found = db
                .set_person_memberships(Uuid::new_v4(), SetMembershipsInput::default(), "test")
                .expect("Query failed");
            assert!(!found);
        }

        it "rejects a group from another event" {
            let event = create_test_event(&db);
            let other_event = create_test_event(&db);
            let foreign = create_test_group(&db, &other_event, "VIP");
            let alice = import_people(&db, &event, vec![person_row("Alice", "alice@example.com")])[0].id;

            let err = db
                .set_person_memberships(alice, SetMembershipsInput { group_ids: vec![foreign.id] }, "test")
                .unwrap_err();
            assert!(matches!(
                store_error(&err),
                StoreError::Validation(ValidationError::ForeignEntity("group"))
            ));
        }
    }

    describe "enrollments" {
        it "defaults to a manual enrollment with priority 100" {
            let event = create_test_event(&db);
            let s1 = create_test_session(&db, &event, "S1", "09:00", "10:00");
            let alice = import_people(&db, &event, vec![person_row("Alice", "alice@example.com")])[0].id;

            let enrollment = db.set_enrollment(alice, s1.id, SetEnrollmentInput {
                status: EnrollmentStatus::Declined,
                priority: None,
                source: None,
            }, "test").expect("Failed to set enrollment");

            assert_eq!(enrollment.source, EnrollmentSource::Manual);
            assert_eq!(enrollment.priority, 100);
            assert_eq!(db.get_person_enrollments(alice).expect("Query failed"), vec![enrollment]);
        }

        it "keeps a single enrollment per person and session" {
            let event = create_test_event(&db);
            let s1 = create_test_session(&db, &event, "S1", "09:00", "10:00");
            let alice = import_people(&db, &event, vec![person_row("Alice", "alice@example.com")])[0].id;

            for status in [EnrollmentStatus::Assigned, EnrollmentStatus::Waitlist, EnrollmentStatus::Declined] {
                db.set_enrollment(alice, s1.id, SetEnrollmentInput {
                    status,
                    priority: None,
                    source: Some(EnrollmentSource::Import),
                }, "test").expect("Failed to set enrollment");
            }

            let enrollments = db.get_person_enrollments(alice).expect("Query failed");
            assert_eq!(enrollments.len(), 1);
            assert_eq!(enrollments[0].status, EnrollmentStatus::Declined);
        }

        it "rejects the rule source" {
            let event = create_test_event(&db);
            let s1 = create_test_session(&db, &event, "S1", "09:00", "10:00");
            let alice = import_people(&db, &event, vec![person_row("Alice", "alice@example.com")])[0].id;

            let err = db.set_enrollment(alice, s1.id, SetEnrollmentInput {
                status: EnrollmentStatus::Assigned,
                priority: None,
                source: Some(EnrollmentSource::Rule),
            }, "test").unwrap_err();
            assert!(matches!(
                store_error(&err),
                StoreError::Validation(ValidationError::ReservedSource)
            ));
        }

        it "fails for an unknown session" {
            let event = create_test_event(&db);
            let alice = import_people(&db, &event, vec![person_row("Alice", "alice@example.com")])[0].id;

            let err = db.set_enrollment(alice, Uuid::new_v4(), SetEnrollmentInput {
                status: EnrollmentStatus::Assigned,
                priority: None,
                source: None,
            }, "test").unwrap_err();
            assert!(matches!(store_error(&err), StoreError::NotFound("Session")));
        }
    }

    describe "recompute_assignments" {
        it "returns None for a non-existent event" {
            let result = db.recompute_assignments(Uuid::new_v4(), "test").expect("Recompute failed");
            assert!(result.is_none());
        }

        it "persists rule enrollments and waitlists beyond capacity" {
            let event = create_test_event(&db);
            let vip = create_test_group(&db, &event, "VIP");
            let dinner = db.create_session(event.id, session_input("DIN", "20:00", "23:00", Some(1)))
                .expect("Failed to create session");
            db.create_rule(vip.id, include_rule(&[&dinner], 90)).expect("Failed to create rule");
            let mut alice = person_row("Alice", "alice@example.com");
            alice.memberships = Some(vec![vip.id]);
            let mut bob = person_row("Bob", "bob@example.com");
            bob.memberships = Some(vec![vip.id]);
            let people = import_people(&db, &event, vec![alice, bob]);

            let result = db.recompute_assignments(event.id, "test").expect("Recompute failed").unwrap();

            assert_eq!(result.event_id, event.id);
            assert_eq!(result.diagnostics.len(), 2);
            assert_eq!(result.diagnostics[0].person_id, people[0].id);
            assert_eq!(result.diagnostics[0].added_sessions, vec![dinner.id]);
            assert_eq!(result.diagnostics[1].waitlisted_sessions, vec![dinner.id]);

            let alice_enrollments = db.get_person_enrollments(people[0].id).expect("Query failed");
            assert_eq!(alice_enrollments[0].status, EnrollmentStatus::Assigned);
            assert_eq!(alice_enrollments[0].source, EnrollmentSource::Rule);
            assert_eq!(alice_enrollments[0].priority, ASSIGNED_PRIORITY);
            let bob_enrollments = db.get_person_enrollments(people[1].id).expect("Query failed");
            assert_eq!(bob_enrollments[0].status, EnrollmentStatus::Waitlist);
        }

        it "adds nothing when run twice" {
            let event = create_test_event(&db);
            let vip = create_test_group(&db, &event, "VIP");
            let s1 = create_test_session(&db, &event, "S1", "09:00", "10:00");
            let s2 = create_test_session(&db, &event, "S2", "09:30", "10:30");
            db.create_rule(vip.id, include_rule(&[&s1], 90)).expect("Failed to create rule");
            db.create_rule(vip.id, include_rule(&[&s2], 70)).expect("Failed to create rule");
            let mut row = person_row("Alice", "alice@example.com");
            row.memberships = Some(vec![vip.id]);
            let alice = import_people(&db, &event, vec![row])[0].id;

            let first = db.recompute_assignments(event.id, "test").expect("Recompute failed").unwrap();
            assert_eq!(first.diagnostics[0].added_sessions, vec![s1.id]);
            assert_eq!(first.diagnostics[0].conflicts, vec![s2.id]);

            let second = db.recompute_assignments(event.id, "test").expect("Recompute failed").unwrap();
            assert!(second.diagnostics[0].added_sessions.is_empty());
            assert!(second.diagnostics[0].waitlisted_sessions.is_empty());
            assert_eq!(db.get_person_enrollments(alice).expect("Query failed").len(), 1);
        }

        it "never overrides a manual decision" {
            let event = create_test_event(&db);
            let vip = create_test_group(&db, &event, "VIP");
            let s1 = create_test_session(&db, &event, "S1", "09:00", "10:00");
            db.create_rule(vip.id, include_rule(&[&s1], 90)).expect("Failed to create rule");
            let mut row = person_row("Alice", "alice@example.com");
            row.memberships = Some(vec![vip.id]);
            let alice = import_people(&db, &event, vec![row])[0].id;
            db.set_enrollment(alice, s1.id, SetEnrollmentInput {
                status: EnrollmentStatus::Declined,
                priority: None,
                source: None,
            }, "test").expect("Failed to set enrollment");

            db.recompute_assignments(event.id, "test").expect("Recompute failed");

            let enrollments = db.get_person_enrollments(alice).expect("Query failed");
            assert_eq!(enrollments.len(), 1);
            assert_eq!(enrollments[0].status, EnrollmentStatus::Declined);
            assert_eq!(enrollments[0].source, EnrollmentSource::Manual);
        }

        it "leaves other events alone" {
            let event = create_test_event(&db);
            let other = create_test_event(&db);
            let vip = create_test_group(&db, &other, "VIP");
            let s1 = create_test_session(&db, &other, "S1", "09:00", "10:00");
            db.create_rule(vip.id, include_rule(&[&s1], 90)).expect("Failed to create rule");
            let mut row = person_row("Alice", "alice@example.com");
            row.memberships = Some(vec![vip.id]);
            let alice = import_people(&db, &other, vec![row])[0].id;

            let result = db.recompute_assignments(event.id, "test").expect("Recompute failed").unwrap();

            assert!(result.diagnostics.is_empty());
            assert!(db.get_person_enrollments(alice).expect("Query failed").is_empty());
        }

        it "writes an audit entry with the totals" {
            let event = create_test_event(&db);

            db.recompute_assignments(event.id, "ops-lead").expect("Recompute failed");

            let logs = db.get_audit_logs(Some(event.id)).expect("Query failed");
            assert_eq!(logs.len(), 1);
            assert_eq!(logs[0].action, "assignments.recompute");
            assert_eq!(logs[0].actor, "ops-lead");
            assert_eq!(logs[0].entity, "event");
            assert_eq!(logs[0].after.as_ref().unwrap()["people"], 0);
        }
    }

    describe "load_snapshot" {
        it "collects the event's data in person order" {
            let event = create_test_event(&db);
            let vip = create_test_group(&db, &event, "VIP");
            let s1 = create_test_session(&db, &event, "S1", "09:00", "10:00");
            db.create_rule(vip.id, include_rule(&[&s1], 90)).expect("Failed to create rule");
            let mut row = person_row("Alice", "alice@example.com");
            row.memberships = Some(vec![vip.id]);
            let people = import_people(&db, &event, vec![row, person_row("Bob", "bob@example.com")]);

            let snapshot = db.load_snapshot(event.id).expect("Query failed").unwrap();

            assert_eq!(snapshot.people, vec![people[0].id, people[1].id]);
            assert_eq!(snapshot.sessions.len(), 1);
            assert_eq!(snapshot.rules.len(), 1);
            assert_eq!(
                snapshot.memberships,
                vec![Membership {
                    person_id: people[0].id,
                    group_id: vip.id,
                }]
            );
            assert!(snapshot.enrollments.is_empty());
        }
    }

    describe "audit logs" {
        it "lists entries newest first" {
            let event = create_test_event(&db);
            let alice = import_people(&db, &event, vec![person_row("Alice", "alice@example.com")])[0].id;
            db.update_person(alice, UpdatePersonInput {
                notes: Some(Some("Vegetarian".to_string())),
                ..Default::default()
            }, "test").expect("Update failed");

            let actions: Vec<String> = db
                .get_audit_logs(Some(alice))
                .expect("Query failed")
                .into_iter()
                .map(|log| log.action)
                .collect();
            assert_eq!(actions, vec!["people.update", "people.create"]);
        }
    }
}
