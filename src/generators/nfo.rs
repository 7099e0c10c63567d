//! NFO file generator (Kodi compatible).

use crate::models::media::{MediaRecord, SeasonRecord};

/// Sidecar filename written into every movie folder.
pub const MOVIE_NFO: &str = "movie.nfo";
/// Sidecar filename written into every season folder.
pub const SEASON_NFO: &str = "season.nfo";
/// Artwork filename placed next to the sidecar.
pub const POSTER_FILE: &str = "poster.jpg";

const XML_HEADER: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n";

/// Generate movie NFO content (Kodi/Emby/Jellyfin compatible).
pub fn generate_movie_nfo(movie: &MediaRecord) -> String {
    let extras = &movie.extras;
    let mut nfo = String::from(XML_HEADER);
    nfo.push_str("<movie>\n");

    nfo.push_str(&format!("  <title>{}</title>\n", escape_xml(&movie.localized_title)));
    nfo.push_str(&format!(
        "  <originaltitle>{}</originaltitle>\n",
        escape_xml(&movie.original_title)
    ));

    // Year and release date
    nfo.push_str(&format!("  <year>{}</year>\n", movie.year));
    if let Some(ref release_date) = extras.release_date {
        nfo.push_str(&format!("  <releasedate>{}</releasedate>\n", escape_xml(release_date)));
        nfo.push_str(&format!("  <premiered>{}</premiered>\n", escape_xml(release_date)));
    }
    if let Some(runtime) = extras.runtime {
        nfo.push_str(&format!("  <runtime>{}</runtime>\n", runtime));
    }

    if let Some(rating) = extras.rating {
        nfo.push_str("  <ratings>\n");
        nfo.push_str("    <rating name=\"themoviedb\" max=\"10\" default=\"true\">\n");
        nfo.push_str(&format!("      <value>{:.1}</value>\n", rating));
        if let Some(votes) = extras.votes {
            nfo.push_str(&format!("      <votes>{}</votes>\n", votes));
        }
        nfo.push_str("    </rating>\n");
        nfo.push_str("  </ratings>\n");
    }

    if !movie.overview.is_empty() {
        nfo.push_str(&format!("  <plot>{}</plot>\n", escape_xml(&movie.overview)));
        nfo.push_str(&format!("  <outline>{}</outline>\n", escape_xml(&movie.overview)));
    }

    push_ids(&mut nfo, movie);

    for genre in &extras.genres {
        nfo.push_str(&format!("  <genre>{}</genre>\n", escape_xml(genre)));
    }
    for country in &movie.countries {
        nfo.push_str(&format!("  <country>{}</country>\n", escape_xml(&country.name)));
    }
    for studio in &extras.studios {
        nfo.push_str(&format!("  <studio>{}</studio>\n", escape_xml(studio)));
    }
    for director in &extras.directors {
        nfo.push_str(&format!("  <director>{}</director>\n", escape_xml(director)));
    }

    for (order, actor) in extras.cast.iter().enumerate() {
        nfo.push_str("  <actor>\n");
        nfo.push_str(&format!("    <name>{}</name>\n", escape_xml(&actor.name)));
        if let Some(ref role) = actor.role {
            nfo.push_str(&format!("    <role>{}</role>\n", escape_xml(role)));
        }
        nfo.push_str(&format!("    <order>{}</order>\n", order));
        nfo.push_str("  </actor>\n");
    }

    if let Some(ref thumb) = extras.thumb_url {
        nfo.push_str(&format!(
            "  <thumb aspect=\"poster\">{}</thumb>\n",
            escape_xml(thumb)
        ));
    }
    if let Some(ref fanart) = extras.fanart_url {
        nfo.push_str("  <fanart>\n");
        nfo.push_str(&format!("    <thumb>{}</thumb>\n", escape_xml(fanart)));
        nfo.push_str("  </fanart>\n");
    }

    nfo.push_str("</movie>\n");
    nfo
}

/// Generate season NFO content. The plot falls back to the show overview.
pub fn generate_season_nfo(show: &MediaRecord, season: &SeasonRecord) -> String {
    let mut nfo = String::from(XML_HEADER);
    nfo.push_str("<season>\n");

    nfo.push_str(&format!(
        "  <title>Season {}</title>\n",
        season.season_number
    ));
    nfo.push_str(&format!(
        "  <showtitle>{}</showtitle>\n",
        escape_xml(&show.localized_title)
    ));
    nfo.push_str(&format!(
        "  <originaltitle>{}</originaltitle>\n",
        escape_xml(&show.original_title)
    ));
    nfo.push_str(&format!(
        "  <seasonnumber>{}</seasonnumber>\n",
        season.season_number
    ));
    nfo.push_str(&format!("  <year>{}</year>\n", season.air_year));

    let plot = if season.overview.is_empty() {
        &show.overview
    } else {
        &season.overview
    };
    if !plot.is_empty() {
        nfo.push_str(&format!("  <plot>{}</plot>\n", escape_xml(plot)));
    }

    push_ids(&mut nfo, show);

    nfo.push_str("</season>\n");
    nfo
}

fn push_ids(nfo: &mut String, record: &MediaRecord) {
    nfo.push_str(&format!(
        "  <uniqueid type=\"tmdb\" default=\"true\">{}</uniqueid>\n",
        record.external_id
    ));
    if let Some(ref imdb_id) = record.imdb_id {
        nfo.push_str(&format!(
            "  <uniqueid type=\"imdb\">{}</uniqueid>\n",
            escape_xml(imdb_id)
        ));
    }
}

/// Escape XML special characters.
pub fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::media::{CastMember, Country, MediaKind, RecordExtras};

    fn avatar() -> MediaRecord {
        MediaRecord {
            kind: MediaKind::Movie,
            localized_title: "阿凡达".to_string(),
            original_title: "Avatar".to_string(),
            year: 2009,
            external_id: 19995,
            imdb_id: Some("tt0499549".to_string()),
            overview: "一个关于潘多拉星球的故事".to_string(),
            poster_ref: None,
            countries: vec![Country {
                code: "US".to_string(),
                name: "United States of America".to_string(),
            }],
            extras: RecordExtras::default(),
        }
    }

    #[test]
    fn test_generate_movie_nfo() {
        let nfo = generate_movie_nfo(&avatar());
        assert!(nfo.starts_with("<?xml"));
        assert!(nfo.contains("<title>阿凡达</title>"));
        assert!(nfo.contains("<originaltitle>Avatar</originaltitle>"));
        assert!(nfo.contains("<year>2009</year>"));
        assert!(nfo.contains("<uniqueid type=\"tmdb\" default=\"true\">19995</uniqueid>"));
        assert!(nfo.contains("tt0499549"));
        assert!(nfo.contains("<country>United States of America</country>"));
        assert!(nfo.trim_end().ends_with("</movie>"));
        assert!(!nfo.contains("<ratings>"));
        assert!(!nfo.contains("<actor>"));
    }

    #[test]
    fn test_generate_movie_nfo_with_extras() {
        let mut movie = avatar();
        movie.extras = RecordExtras {
            release_date: Some("2009-12-15".to_string()),
            runtime: Some(162),
            rating: Some(7.56),
            votes: Some(31000),
            genres: vec!["科幻".to_string()],
            studios: vec!["Lightstorm & Co".to_string()],
            directors: vec!["James Cameron".to_string()],
            cast: vec![
                CastMember {
                    name: "Sam Worthington".to_string(),
                    role: Some("Jake Sully".to_string()),
                },
                CastMember {
                    name: "Zoe Saldana".to_string(),
                    role: None,
                },
            ],
            thumb_url: Some("https://image.tmdb.org/t/p/w500/p.jpg".to_string()),
            fanart_url: Some("https://image.tmdb.org/t/p/original/b.jpg".to_string()),
        };

        let nfo = generate_movie_nfo(&movie);
        assert!(nfo.contains("<premiered>2009-12-15</premiered>"));
        assert!(nfo.contains("<runtime>162</runtime>"));
        assert!(nfo.contains("<value>7.6</value>"));
        assert!(nfo.contains("<votes>31000</votes>"));
        assert!(nfo.contains("<genre>科幻</genre>"));
        assert!(nfo.contains("<studio>Lightstorm &amp; Co</studio>"));
        assert!(nfo.contains("<director>James Cameron</director>"));
        assert!(nfo.contains(
            "<name>Sam Worthington</name>\n    <role>Jake Sully</role>\n    <order>0</order>"
        ));
        assert!(nfo.contains("<name>Zoe Saldana</name>\n    <order>1</order>"));
        assert!(nfo.contains("<thumb aspect=\"poster\">https://image.tmdb.org/t/p/w500/p.jpg</thumb>"));
        assert!(nfo.contains("<fanart>\n    <thumb>https://image.tmdb.org/t/p/original/b.jpg</thumb>"));
    }

    #[test]
    fn test_generate_season_nfo_falls_back_to_show_overview() {
        let mut show = avatar();
        show.kind = MediaKind::TvShow;
        let season = SeasonRecord {
            season_number: 2,
            air_year: 2012,
            overview: String::new(),
            poster_ref: None,
        };

        let nfo = generate_season_nfo(&show, &season);
        assert!(nfo.contains("<title>Season 2</title>"));
        assert!(nfo.contains("<seasonnumber>2</seasonnumber>"));
        assert!(nfo.contains("<year>2012</year>"));
        assert!(nfo.contains("<plot>一个关于潘多拉星球的故事</plot>"));
    }

    #[test]
    fn test_escape_xml() {
        assert_eq!(escape_xml("Tom & Jerry <\"'>"), "Tom &amp; Jerry &lt;&quot;&apos;&gt;");
    }
}
