use chrono::NaiveDate;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::Mutex;

use crate::config::MatchingSettings;
use crate::models::{BirthDate, DisplayName, Gender, GroupId, Profile, ProfileId};

/// Profile fields requested for every user lookup and search
pub const USER_FIELDS: &str = "bdate,sex,city,interests,music,books,domain,is_closed";

/// Errors that can occur when talking to the VK API
#[derive(Debug, Error)]
pub enum VkError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("API rate limit exceeded, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Unauthorized: access token rejected (code {code})")]
    Unauthorized { code: i64 },

    #[error("API returned error {code}: {message}")]
    Api { code: i64, message: String },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),

    #[error("Seed profile {0} lacks {1} needed to search for candidates")]
    IncompleteSeed(ProfileId, &'static str),
}

impl VkError {
    /// Map a VK `error` object to a typed error
    fn from_api(code: i64, message: String, retry_after: Option<u64>) -> Self {
        match code {
            6 => VkError::RateLimited {
                retry_after_secs: retry_after.unwrap_or(1),
            },
            5 | 17 => VkError::Unauthorized { code },
            _ => VkError::Api { code, message },
        }
    }
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error_code: i64,
    #[serde(default)]
    error_msg: String,
    #[serde(default)]
    request_params: Vec<RequestParam>,
}

#[derive(Debug, Deserialize)]
struct RequestParam {
    key: String,
    value: Value,
}

#[derive(Debug, Deserialize)]
struct VkCity {
    id: i64,
}

/// User object as it arrives on the wire
#[derive(Debug, Deserialize)]
struct VkUser {
    id: ProfileId,
    #[serde(default)]
    first_name: String,
    #[serde(default)]
    last_name: String,
    #[serde(default)]
    domain: Option<String>,
    #[serde(default)]
    sex: u8,
    #[serde(default)]
    bdate: Option<String>,
    #[serde(default)]
    city: Option<VkCity>,
    #[serde(default)]
    interests: Option<String>,
    #[serde(default)]
    music: Option<String>,
    #[serde(default)]
    books: Option<String>,
    #[serde(default)]
    is_closed: bool,
    #[serde(default)]
    deactivated: Option<String>,
}

fn non_blank(text: Option<String>) -> Option<String> {
    text.filter(|t| !t.trim().is_empty())
}

impl From<VkUser> for Profile {
    fn from(user: VkUser) -> Self {
        let handle = user
            .domain
            .filter(|d| !d.is_empty())
            .unwrap_or_else(|| format!("id{}", user.id));

        Profile {
            id: user.id,
            name: DisplayName {
                first: user.first_name,
                last: user.last_name,
            },
            handle,
            gender: Gender::from_vk_code(user.sex),
            birth_date: user.bdate.as_deref().and_then(BirthDate::parse),
            city_id: user.city.map(|c| c.id),
            interests: non_blank(user.interests),
            music: non_blank(user.music),
            books: non_blank(user.books),
            groups: BTreeSet::new(),
            // Deleted and banned pages are as unreachable as closed ones
            is_closed: user.is_closed || user.deactivated.is_some(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ItemsPage<T> {
    #[serde(default)]
    count: u64,
    #[serde(default = "Vec::new")]
    items: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct LikesCount {
    #[serde(default)]
    count: u64,
}

#[derive(Debug, Deserialize)]
struct VkPhoto {
    id: i64,
    owner_id: i64,
    #[serde(default)]
    likes: Option<LikesCount>,
}

/// Reference to a photo, ordered by popularity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhotoRef {
    pub owner_id: i64,
    pub photo_id: i64,
    pub likes: u64,
}

impl PhotoRef {
    /// Attachment string accepted by `messages.send`
    pub fn attachment(&self) -> String {
        format!("photo{}_{}", self.owner_id, self.photo_id)
    }

    /// Parse an attachment string such as `photo123_456` or `photo-1_2`
    pub fn parse_attachment(raw: &str) -> Option<(i64, i64)> {
        let rest = raw.strip_prefix("photo")?;
        let (owner, photo) = rest.split_once('_')?;
        Some((owner.parse().ok()?, photo.parse().ok()?))
    }
}

/// Parameters of one `users.search` call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchFilter {
    pub city_id: i64,
    pub sex: Gender,
    pub age_from: u32,
    pub age_to: u32,
    pub status: Option<u8>,
    pub offset: u32,
    pub count: u32,
}

impl SearchFilter {
    fn to_params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("city", self.city_id.to_string()),
            ("sex", self.sex.vk_code().to_string()),
            ("age_from", self.age_from.to_string()),
            ("age_to", self.age_to.to_string()),
            ("has_photo", "1".to_string()),
            ("offset", self.offset.to_string()),
            ("count", self.count.to_string()),
            ("fields", USER_FIELDS.to_string()),
        ];
        if let Some(status) = self.status {
            params.push(("status", status.to_string()));
        }
        params
    }
}

/// Build the sequence of searches that together form a seed's candidate pool.
///
/// Age window is the seed's age ± `age_range`, clamped to the allowed ages;
/// one page run per marital status, or a single run when none is configured.
pub fn search_filters(
    seed: &Profile,
    settings: &MatchingSettings,
    today: NaiveDate,
) -> Result<Vec<SearchFilter>, VkError> {
    let age = seed
        .age_on(today)
        .ok_or(VkError::IncompleteSeed(seed.id, "a birth year"))?;
    let sex = seed
        .gender
        .opposite()
        .ok_or(VkError::IncompleteSeed(seed.id, "a gender"))?;
    let city_id = seed
        .city_id
        .ok_or(VkError::IncompleteSeed(seed.id, "a city"))?;

    let age_from = age.saturating_sub(settings.age_range).max(settings.min_age);
    let age_to = (age + settings.age_range).min(settings.max_age);

    let statuses: Vec<Option<u8>> = if settings.search_statuses.is_empty() {
        vec![None]
    } else {
        settings.search_statuses.iter().copied().map(Some).collect()
    };

    let mut filters = Vec::new();
    for status in statuses {
        for page in 0..settings.pages_per_status.max(1) {
            filters.push(SearchFilter {
                city_id,
                sex,
                age_from,
                age_to,
                status,
                offset: page * settings.page_size,
                count: settings.page_size,
            });
        }
    }

    Ok(filters)
}

/// VK API client
///
/// Handles all communication with the social network including:
/// - Looking up seed profiles and their group memberships
/// - Searching candidate profiles
/// - Collecting the most liked photos of a profile
pub struct VkClient {
    base_url: String,
    access_token: String,
    api_version: String,
    client: Client,
    min_interval: Duration,
    last_call: Mutex<Option<Instant>>,
}

impl VkClient {
    /// Create a new VK client
    pub fn new(
        base_url: String,
        access_token: String,
        api_version: String,
        timeout: Duration,
        min_interval: Duration,
    ) -> Result<Self, VkError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            base_url,
            access_token,
            api_version,
            client,
            min_interval,
            last_call: Mutex::new(None),
        })
    }

    /// Wait until the minimum spacing since the previous call has passed
    async fn throttle(&self) {
        let mut last_call = self.last_call.lock().await;
        if let Some(previous) = *last_call {
            let elapsed = previous.elapsed();
            if elapsed < self.min_interval {
                tokio::time::sleep(self.min_interval - elapsed).await;
            }
        }
        *last_call = Some(Instant::now());
    }

    /// Invoke an API method and decode its `response` payload
    pub async fn call_method<T: DeserializeOwned>(
        &self,
        method: &str,
        params: &[(&str, String)],
    ) -> Result<T, VkError> {
        self.throttle().await;

        let url = format!("{}/{}", self.base_url.trim_end_matches('/'), method);
        tracing::debug!("Calling VK method {}", method);

        let response = self
            .client
            .post(&url)
            .query(&[
                ("access_token", self.access_token.as_str()),
                ("v", self.api_version.as_str()),
                ("lang", "ru"),
            ])
            .query(params)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(VkError::InvalidResponse(format!(
                "{} returned HTTP {}",
                method,
                response.status()
            )));
        }

        let json: Value = response.json().await?;

        if let Some(error) = json.get("error") {
            let body: ApiErrorBody = serde_json::from_value(error.clone())
                .map_err(|e| VkError::InvalidResponse(format!("Malformed error object: {}", e)))?;
            let retry_after = body
                .request_params
                .iter()
                .find(|p| p.key == "retry_after")
                .and_then(|p| match &p.value {
                    Value::Number(n) => n.as_u64(),
                    Value::String(s) => s.parse().ok(),
                    _ => None,
                });
            tracing::warn!(
                "VK method {} failed: {} ({})",
                method,
                body.error_msg,
                body.error_code
            );
            return Err(VkError::from_api(body.error_code, body.error_msg, retry_after));
        }

        let payload = json
            .get("response")
            .cloned()
            .ok_or_else(|| VkError::InvalidResponse(format!("{}: missing response", method)))?;

        serde_json::from_value(payload)
            .map_err(|e| VkError::InvalidResponse(format!("{}: {}", method, e)))
    }

    /// Look up a single profile together with its group memberships
    pub async fn fetch_profile(&self, user_id: ProfileId) -> Result<Profile, VkError> {
        let users: Vec<Value> = self
            .call_method(
                "users.get",
                &[("user_ids", user_id.to_string()), ("fields", USER_FIELDS.to_string())],
            )
            .await?;

        let raw = users
            .into_iter()
            .next()
            .ok_or_else(|| VkError::NotFound(format!("Profile {} not found", user_id)))?;

        let user: VkUser = serde_json::from_value(raw)
            .map_err(|e| VkError::InvalidResponse(format!("Failed to parse profile: {}", e)))?;

        let mut profile = Profile::from(user);
        profile.groups = self.fetch_groups(user_id).await?;

        Ok(profile)
    }

    /// Group ids the user is a member of. A hidden group list is not an error.
    pub async fn fetch_groups(&self, user_id: ProfileId) -> Result<BTreeSet<GroupId>, VkError> {
        let result: Result<ItemsPage<GroupId>, VkError> = self
            .call_method(
                "groups.get",
                &[("user_id", user_id.to_string()), ("count", "1000".to_string())],
            )
            .await;

        match result {
            Ok(page) => Ok(page.items.into_iter().collect()),
            Err(VkError::Api { code, message }) => {
                tracing::debug!("Groups of {} unavailable ({}): {}", user_id, code, message);
                Ok(BTreeSet::new())
            }
            Err(e) => Err(e),
        }
    }

    /// Run one candidate search. Records that fail to decode are skipped.
    pub async fn fetch_candidates(&self, filter: &SearchFilter) -> Result<Vec<Profile>, VkError> {
        let page: ItemsPage<Value> = self
            .call_method("users.search", &filter.to_params())
            .await?;

        let total = page.count;
        let profiles: Vec<Profile> = page
            .items
            .into_iter()
            .filter_map(|item| match serde_json::from_value::<VkUser>(item) {
                Ok(user) => Some(Profile::from(user)),
                Err(e) => {
                    tracing::warn!("Skipping undecodable search result: {}", e);
                    None
                }
            })
            .collect();

        tracing::debug!(
            "Search status={:?} offset={} returned {} profiles (total: {})",
            filter.status,
            filter.offset,
            profiles.len(),
            total
        );

        Ok(profiles)
    }

    /// Concatenate every configured search for the seed, in order.
    ///
    /// Search results carry no group memberships. With `with_groups` set, each
    /// distinct open candidate gets one `groups.get` lookup and every record of
    /// that identity receives the result.
    pub async fn fetch_candidate_pool(
        &self,
        seed: &Profile,
        settings: &MatchingSettings,
        with_groups: bool,
    ) -> Result<Vec<Profile>, VkError> {
        let filters = search_filters(seed, settings, chrono::Utc::now().date_naive())?;

        let mut pool = Vec::new();
        for filter in &filters {
            pool.extend(self.fetch_candidates(filter).await?);
        }

        if with_groups {
            self.attach_groups(seed, &mut pool).await?;
        }

        tracing::debug!(
            "Fetched pool of {} profiles for {} over {} searches",
            pool.len(),
            seed.id,
            filters.len()
        );

        Ok(pool)
    }

    /// Fill in group memberships of the candidates that can still be ranked
    async fn attach_groups(&self, seed: &Profile, pool: &mut [Profile]) -> Result<(), VkError> {
        let ids: BTreeSet<ProfileId> = pool
            .iter()
            .filter(|p| !p.is_closed && p.id != seed.id)
            .map(|p| p.id)
            .collect();

        let mut memberships: HashMap<ProfileId, BTreeSet<GroupId>> =
            HashMap::with_capacity(ids.len());
        for id in ids {
            memberships.insert(id, self.fetch_groups(id).await?);
        }

        for profile in pool.iter_mut() {
            if let Some(groups) = memberships.get(&profile.id) {
                profile.groups = groups.clone();
            }
        }

        tracing::debug!("Loaded group memberships of {} candidates", memberships.len());

        Ok(())
    }

    /// Most liked photos across the profile album and tagged photos
    pub async fn top_photos(
        &self,
        owner_id: ProfileId,
        limit: usize,
    ) -> Result<Vec<PhotoRef>, VkError> {
        let profile_album: ItemsPage<VkPhoto> = self
            .call_method(
                "photos.get",
                &[
                    ("owner_id", owner_id.to_string()),
                    ("album_id", "profile".to_string()),
                    ("extended", "1".to_string()),
                ],
            )
            .await?;

        let tagged: Vec<VkPhoto> = match self
            .call_method::<ItemsPage<VkPhoto>>(
                "photos.getUserPhotos",
                &[("user_id", owner_id.to_string()), ("extended", "1".to_string())],
            )
            .await
        {
            Ok(page) => page.items,
            Err(VkError::Api { code, message }) => {
                tracing::debug!(
                    "Tagged photos of {} unavailable ({}): {}",
                    owner_id,
                    code,
                    message
                );
                Vec::new()
            }
            Err(e) => return Err(e),
        };

        Ok(rank_photos(profile_album.items.into_iter().chain(tagged), limit))
    }
}

fn rank_photos(photos: impl IntoIterator<Item = VkPhoto>, limit: usize) -> Vec<PhotoRef> {
    let mut seen = HashSet::new();
    let mut refs: Vec<PhotoRef> = photos
        .into_iter()
        .filter(|p| seen.insert((p.owner_id, p.id)))
        .map(|p| PhotoRef {
            owner_id: p.owner_id,
            photo_id: p.id,
            likes: p.likes.map(|l| l.count).unwrap_or(0),
        })
        .collect();

    refs.sort_by(|a, b| b.likes.cmp(&a.likes).then_with(|| a.photo_id.cmp(&b.photo_id)));
    refs.truncate(limit);
    refs
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seed(bdate: &str, sex: u8, city: Option<i64>) -> Profile {
        Profile {
            id: 1,
            gender: Gender::from_vk_code(sex),
            birth_date: BirthDate::parse(bdate),
            city_id: city,
            ..Default::default()
        }
    }

    #[test]
    fn test_wire_user_conversion() {
        let raw = serde_json::json!({
            "id": 456,
            "first_name": "Match",
            "last_name": "User",
            "bdate": "01.01.1992",
            "sex": 1,
            "city": {"id": 1, "title": "Москва"},
            "interests": "music",
            "music": "  ",
            "is_closed": false,
            "domain": "matchuser"
        });

        let profile = Profile::from(serde_json::from_value::<VkUser>(raw).unwrap());

        assert_eq!(profile.id, 456);
        assert_eq!(profile.name.to_string(), "Match User");
        assert_eq!(profile.gender, Gender::Female);
        assert_eq!(profile.birth_year(), Some(1992));
        assert_eq!(profile.city_id, Some(1));
        assert_eq!(profile.interests.as_deref(), Some("music"));
        assert_eq!(profile.music, None);
        assert_eq!(profile.handle, "matchuser");
        assert!(!profile.is_closed);
    }

    #[test]
    fn test_deactivated_user_is_closed() {
        let raw = serde_json::json!({"id": 9, "deactivated": "deleted"});
        let profile = Profile::from(serde_json::from_value::<VkUser>(raw).unwrap());
        assert!(profile.is_closed);
        assert_eq!(profile.handle, "id9");
    }

    #[test]
    fn test_api_error_mapping() {
        assert!(matches!(
            VkError::from_api(6, "Too many".into(), Some(3)),
            VkError::RateLimited { retry_after_secs: 3 }
        ));
        assert!(matches!(
            VkError::from_api(5, "auth".into(), None),
            VkError::Unauthorized { code: 5 }
        ));
        assert!(matches!(
            VkError::from_api(100, "bad param".into(), None),
            VkError::Api { code: 100, .. }
        ));
    }

    #[test]
    fn test_search_filters_for_seed() {
        let today = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let settings = MatchingSettings {
            pages_per_status: 2,
            ..MatchingSettings::default()
        };

        let filters = search_filters(&seed("1.1.2004", 2, Some(1)), &settings, today).unwrap();

        assert_eq!(filters.len(), 4);
        assert!(filters.iter().all(|f| f.sex == Gender::Female && f.city_id == 1));
        // 20 years old: 15 is below the minimum age
        assert_eq!(filters[0].age_from, 18);
        assert_eq!(filters[0].age_to, 25);
        assert_eq!(filters[0].status, Some(1));
        assert_eq!(filters[1].offset, 100);
        assert_eq!(filters[2].status, Some(6));
    }

    #[test]
    fn test_search_filters_need_complete_seed() {
        let today = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let settings = MatchingSettings::default();

        assert!(matches!(
            search_filters(&seed("1.1", 2, Some(1)), &settings, today),
            Err(VkError::IncompleteSeed(1, "a birth year"))
        ));
        assert!(matches!(
            search_filters(&seed("1.1.1990", 0, Some(1)), &settings, today),
            Err(VkError::IncompleteSeed(1, "a gender"))
        ));
        assert!(matches!(
            search_filters(&seed("1.1.1990", 1, None), &settings, today),
            Err(VkError::IncompleteSeed(1, "a city"))
        ));
    }

    #[test]
    fn test_rank_photos_by_likes() {
        let photo = |id: i64, likes: u64| VkPhoto {
            id,
            owner_id: 123,
            likes: Some(LikesCount { count: likes }),
        };

        let photos = vec![photo(1, 10), photo(2, 20), photo(3, 30), photo(4, 5), photo(3, 30)];
        let top = rank_photos(photos, 3);

        let attachments: Vec<String> = top.iter().map(PhotoRef::attachment).collect();
        assert_eq!(attachments, vec!["photo123_3", "photo123_2", "photo123_1"]);
    }

    #[test]
    fn test_parse_attachment() {
        assert_eq!(PhotoRef::parse_attachment("photo123_456"), Some((123, 456)));
        assert_eq!(PhotoRef::parse_attachment("photo-5_7"), Some((-5, 7)));
        assert_eq!(PhotoRef::parse_attachment("video1_2"), None);
        assert_eq!(PhotoRef::parse_attachment("photo1"), None);
    }
}
