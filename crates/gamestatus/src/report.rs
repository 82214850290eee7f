//! サーバーの状態一覧から通知メッセージの内容を組み立てる。

use crate::config::Labels;
use crate::status::{ProbeResult, ServerStatus};

pub const COLOR_ONLINE: u32 = 0x00ff00;
pub const COLOR_OFFLINE: u32 = 0xff0000;
pub const COLOR_MIXED: u32 = 0x0099ff;

/// 埋め込みの 1 フィールド。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

/// 通知メッセージの本文。送信先の形式には依存しない。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusReport {
    pub title: String,
    pub description: String,
    pub color: u32,
    pub fields: Vec<ReportField>,
    pub footer: String,
}

/// 状態一覧から通知内容を生成する。副作用はない。
pub fn render(statuses: &[ServerStatus], labels: &Labels) -> StatusReport {
    let (players, max_players) = statuses
        .iter()
        .filter_map(|status| match &status.result {
            ProbeResult::Detailed(details) => Some((details.players, details.max_players)),
            _ => None,
        })
        .fold((0u32, 0u32), |(p, m), (players, max)| {
            (p.saturating_add(players), m.saturating_add(max))
        });

    let description = format!(
        "{}\n{}: {players}/{max_players}",
        labels.description, labels.total_players
    );

    let fields = statuses
        .iter()
        .map(|status| ReportField {
            name: format!("{} ({})", status.name, status.address),
            value: field_value(&status.result, labels),
            inline: false,
        })
        .collect();

    StatusReport {
        title: labels.title.clone(),
        description,
        color: report_color(statuses),
        fields,
        footer: labels.footer.clone(),
    }
}

fn field_value(result: &ProbeResult, labels: &Labels) -> String {
    match result {
        ProbeResult::Detailed(details) => format!(
            "🟢 {}\n{}: {}/{}\n{}: {}\n{}: {}",
            labels.online,
            labels.players,
            details.players,
            details.max_players,
            labels.map,
            details.map,
            labels.name,
            details.name.as_deref().unwrap_or(&labels.not_available),
        ),
        ProbeResult::Online => format!("🟢 {}\n({})", labels.online, labels.details_unavailable),
        ProbeResult::Offline => format!("🔴 {}", labels.offline),
    }
}

fn report_color(statuses: &[ServerStatus]) -> u32 {
    let online = statuses.iter().filter(|s| s.result.is_online()).count();
    if online == 0 {
        COLOR_OFFLINE
    } else if online == statuses.len() {
        COLOR_ONLINE
    } else {
        COLOR_MIXED
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::ServerDetails;

    fn status(name: &str, address: &str, result: ProbeResult) -> ServerStatus {
        ServerStatus {
            name: name.to_string(),
            address: address.to_string(),
            result,
        }
    }

    fn details(players: u32, max_players: u32, map: &str, name: Option<&str>) -> ProbeResult {
        ProbeResult::Detailed(ServerDetails {
            players,
            max_players,
            map: map.to_string(),
            name: name.map(str::to_string),
        })
    }

    #[test]
    fn mixed_servers_scenario() {
        let statuses = vec![
            status(
                "A",
                "10.0.0.1:27015",
                details(5, 10, "de_dust2", Some("Alpha")),
            ),
            status("B", "10.0.0.2:27015", ProbeResult::Online),
        ];

        let report = render(&statuses, &Labels::default());

        assert_eq!(report.title, "CS2 Servers Status");
        assert_eq!(
            report.description,
            "Current status of all monitored servers\nTotal players: 5/10"
        );
        assert_eq!(report.color, COLOR_ONLINE);
        assert_eq!(
            report.fields,
            vec![
                ReportField {
                    name: "A (10.0.0.1:27015)".to_string(),
                    value: "🟢 Online\nPlayers: 5/10\nMap: de_dust2\nName: Alpha".to_string(),
                    inline: false,
                },
                ReportField {
                    name: "B (10.0.0.2:27015)".to_string(),
                    value: "🟢 Online\n(Detailed info unavailable)".to_string(),
                    inline: false,
                },
            ]
        );
    }

    #[test]
    fn offline_server_has_no_details() {
        let statuses = vec![status("C", "10.0.0.3:27015", ProbeResult::Offline)];

        let report = render(&statuses, &Labels::default());

        assert_eq!(report.fields.len(), 1);
        assert_eq!(report.fields[0].value, "🔴 Offline");
        assert_eq!(report.color, COLOR_OFFLINE);
        assert!(report.description.ends_with("Total players: 0/0"));
    }

    #[test]
    fn missing_name_uses_placeholder() {
        let statuses = vec![status("A", "10.0.0.1:27015", details(0, 12, "de_nuke", None))];

        let report = render(&statuses, &Labels::default());

        assert!(report.fields[0].value.ends_with("Name: N/A"));
    }

    #[test]
    fn totals_sum_detailed_servers_only() {
        let statuses = vec![
            status("A", "a:1", details(5, 10, "de_dust2", Some("Alpha"))),
            status("B", "b:1", ProbeResult::Online),
            status("C", "c:1", details(3, 20, "de_mirage", Some("Charlie"))),
            status("D", "d:1", ProbeResult::Offline),
        ];

        let report = render(&statuses, &Labels::default());

        assert!(report.description.ends_with("Total players: 8/30"));
        assert_eq!(report.color, COLOR_MIXED);
    }

    #[test]
    fn one_field_per_server_in_order() {
        for n in 0..5 {
            let statuses: Vec<_> = (0..n)
                .map(|i| status(&format!("srv{i}"), &format!("10.0.0.{i}:27015"), ProbeResult::Offline))
                .collect();

            let report = render(&statuses, &Labels::default());

            assert_eq!(report.fields.len(), n);
            for (i, field) in report.fields.iter().enumerate() {
                assert!(field.name.starts_with(&format!("srv{i} ")));
            }
        }
    }

    #[test]
    fn empty_list_renders_offline_summary() {
        let report = render(&[], &Labels::default());

        assert!(report.fields.is_empty());
        assert_eq!(report.color, COLOR_OFFLINE);
        assert!(report.description.ends_with("Total players: 0/0"));
    }

    #[test]
    fn rendering_is_deterministic() {
        let statuses = vec![
            status("A", "10.0.0.1:27015", details(5, 10, "de_dust2", Some("Alpha"))),
            status("B", "10.0.0.2:27015", ProbeResult::Online),
        ];

        let first = render(&statuses, &Labels::default());
        let second = render(&statuses, &Labels::default());

        assert_eq!(first, second);
    }

    #[test]
    fn custom_labels_are_used() {
        let labels = Labels {
            title: "サーバー状況".to_string(),
            online: "オンライン".to_string(),
            offline: "オフライン".to_string(),
            details_unavailable: "詳細不明".to_string(),
            ..Default::default()
        };
        let statuses = vec![
            status("A", "a:1", ProbeResult::Online),
            status("B", "b:1", ProbeResult::Offline),
        ];

        let report = render(&statuses, &labels);

        assert_eq!(report.title, "サーバー状況");
        assert_eq!(report.fields[0].value, "🟢 オンライン\n(詳細不明)");
        assert_eq!(report.fields[1].value, "🔴 オフライン");
    }
}
