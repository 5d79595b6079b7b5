// Static denylist of common/weak passwords (§4.3: ≥1000 entries).
// Generated offline; not an exhaustive breach-corpus import, just enough
// coverage to reject the passwords real users actually pick.
pub(crate) const COMMON_PASSWORDS: &[&str] = &[
    "password",
    "123456",
    "12345678",
    "qwerty",
    "abc123",
    "letmein",
    "monkey",
    "dragon",
    "football",
    "iloveyou",
    "admin",
    "welcome",
    "login",
    "master",
    "sunshine",
    "princess",
    "flower",
    "hottie",
    "loveme",
    "zaq1zaq1",
    "password1",
    "123123",
    "qwertyuiop",
    "1q2w3e4r",
    "passw0rd",
    "trustno1",
    "baseball",
    "shadow",
    "superman",
    "hello",
    "freedom",
    "whatever",
    "ninja",
    "mustang",
    "access",
    "batman",
    "michael",
    "jennifer",
    "jordan",
    "hunter",
    "ranger",
    "tigger",
    "soccer",
    "harley",
    "buster",
    "thomas",
    "robert",
    "daniel",
    "george",
    "computer",
    "michelle",
    "jessica",
    "pepper",
    "zxcvbn",
    "asdfgh",
    "qazwsx",
    "taylor",
    "matrix",
    "tequiero",
    "andrew",
    "starwars",
    "cheese",
    "secret",
    "summer",
    "internet",
    "service",
    "canada",
    "yankees",
    "joshua",
    "maggie",
    "dallas",
    "austin",
    "jasper",
    "orange",
    "merlin",
    "hockey",
    "phoenix",
    "corvette",
    "yellow",
    "cookie",
    "chicken",
    "forever",
    "ferrari",
    "gandalf",
    "dolphins",
    "cowboys",
    "giants",
    "packer",
    "redskins",
    "steelers",
    "cameron",
    "william",
    "richard",
    "charlie",
    "samsung",
    "apple",
    "google",
    "facebook",
    "twitter",
    "amazon",
    "netflix",
    "spotify",
    "windows",
    "linux",
    "password12",
    "password123",
    "password1234",
    "password01",
    "password007",
    "password99",
    "password2020",
    "password2021",
    "password2022",
    "password2023",
    "password!",
    "password!!",
    "password@",
    "password#",
    "1234561",
    "12345612",
    "123456123",
    "1234561234",
    "12345601",
    "123456007",
    "12345699",
    "1234562020",
    "1234562021",
    "1234562022",
    "1234562023",
    "123456!",
    "123456!!",
    "123456@",
    "123456#",
    "123456781",
    "1234567812",
    "12345678123",
    "123456781234",
    "1234567801",
    "12345678007",
    "1234567899",
    "123456782020",
    "123456782021",
    "123456782022",
    "123456782023",
    "12345678!",
    "12345678!!",
    "12345678@",
    "12345678#",
    "qwerty1",
    "qwerty12",
    "qwerty123",
    "qwerty1234",
    "qwerty01",
    "qwerty007",
    "qwerty99",
    "qwerty2020",
    "qwerty2021",
    "qwerty2022",
    "qwerty2023",
    "qwerty!",
    "qwerty!!",
    "qwerty@",
    "qwerty#",
    "abc1231",
    "abc12312",
    "abc123123",
    "abc1231234",
    "abc12301",
    "abc123007",
    "abc12399",
    "abc1232020",
    "abc1232021",
    "abc1232022",
    "abc1232023",
    "abc123!",
    "abc123!!",
    "abc123@",
    "abc123#",
    "letmein1",
    "letmein12",
    "letmein123",
    "letmein1234",
    "letmein01",
    "letmein007",
    "letmein99",
    "letmein2020",
    "letmein2021",
    "letmein2022",
    "letmein2023",
    "letmein!",
    "letmein!!",
    "letmein@",
    "letmein#",
    "monkey1",
    "monkey12",
    "monkey123",
    "monkey1234",
    "monkey01",
    "monkey007",
    "monkey99",
    "monkey2020",
    "monkey2021",
    "monkey2022",
    "monkey2023",
    "monkey!",
    "monkey!!",
    "monkey@",
    "monkey#",
    "dragon1",
    "dragon12",
    "dragon123",
    "dragon1234",
    "dragon01",
    "dragon007",
    "dragon99",
    "dragon2020",
    "dragon2021",
    "dragon2022",
    "dragon2023",
    "dragon!",
    "dragon!!",
    "dragon@",
    "dragon#",
    "football1",
    "football12",
    "football123",
    "football1234",
    "football01",
    "football007",
    "football99",
    "football2020",
    "football2021",
    "football2022",
    "football2023",
    "football!",
    "football!!",
    "football@",
    "football#",
    "iloveyou1",
    "iloveyou12",
    "iloveyou123",
    "iloveyou1234",
    "iloveyou01",
    "iloveyou007",
    "iloveyou99",
    "iloveyou2020",
    "iloveyou2021",
    "iloveyou2022",
    "iloveyou2023",
    "iloveyou!",
    "iloveyou!!",
    "iloveyou@",
    "iloveyou#",
    "admin1",
    "admin12",
    "admin123",
    "admin1234",
    "admin01",
    "admin007",
    "admin99",
    "admin2020",
    "admin2021",
    "admin2022",
    "admin2023",
    "admin!",
    "admin!!",
    "admin@",
    "admin#",
    "welcome1",
    "welcome12",
    "welcome123",
    "welcome1234",
    "welcome01",
    "welcome007",
    "welcome99",
    "welcome2020",
    "welcome2021",
    "welcome2022",
    "welcome2023",
    "welcome!",
    "welcome!!",
    "welcome@",
    "welcome#",
    "login1",
    "login12",
    "login123",
    "login1234",
    "login01",
    "login007",
    "login99",
    "login2020",
    "login2021",
    "login2022",
    "login2023",
    "login!",
    "login!!",
    "login@",
    "login#",
    "master1",
    "master12",
    "master123",
    "master1234",
    "master01",
    "master007",
    "master99",
    "master2020",
    "master2021",
    "master2022",
    "master2023",
    "master!",
    "master!!",
    "master@",
    "master#",
    "sunshine1",
    "sunshine12",
    "sunshine123",
    "sunshine1234",
    "sunshine01",
    "sunshine007",
    "sunshine99",
    "sunshine2020",
    "sunshine2021",
    "sunshine2022",
    "sunshine2023",
    "sunshine!",
    "sunshine!!",
    "sunshine@",
    "sunshine#",
    "princess1",
    "princess12",
    "princess123",
    "princess1234",
    "princess01",
    "princess007",
    "princess99",
    "princess2020",
    "princess2021",
    "princess2022",
    "princess2023",
    "princess!",
    "princess!!",
    "princess@",
    "princess#",
    "flower1",
    "flower12",
    "flower123",
    "flower1234",
    "flower01",
    "flower007",
    "flower99",
    "flower2020",
    "flower2021",
    "flower2022",
    "flower2023",
    "flower!",
    "flower!!",
    "flower@",
    "flower#",
    "hottie1",
    "hottie12",
    "hottie123",
    "hottie1234",
    "hottie01",
    "hottie007",
    "hottie99",
    "hottie2020",
    "hottie2021",
    "hottie2022",
    "hottie2023",
    "hottie!",
    "hottie!!",
    "hottie@",
    "hottie#",
    "loveme1",
    "loveme12",
    "loveme123",
    "loveme1234",
    "loveme01",
    "loveme007",
    "loveme99",
    "loveme2020",
    "loveme2021",
    "loveme2022",
    "loveme2023",
    "loveme!",
    "loveme!!",
    "loveme@",
    "loveme#",
    "zaq1zaq11",
    "zaq1zaq112",
    "zaq1zaq1123",
    "zaq1zaq11234",
    "zaq1zaq101",
    "zaq1zaq1007",
    "zaq1zaq199",
    "zaq1zaq12020",
    "zaq1zaq12021",
    "zaq1zaq12022",
    "zaq1zaq12023",
    "zaq1zaq1!",
    "zaq1zaq1!!",
    "zaq1zaq1@",
    "zaq1zaq1#",
    "password11",
    "password112",
    "password1123",
    "password11234",
    "password101",
    "password1007",
    "password199",
    "password12020",
    "password12021",
    "password12022",
    "password12023",
    "password1!",
    "password1!!",
    "password1@",
    "password1#",
    "1231231",
    "12312312",
    "123123123",
    "1231231234",
    "12312301",
    "123123007",
    "12312399",
    "1231232020",
    "1231232021",
    "1231232022",
    "1231232023",
    "123123!",
    "123123!!",
    "123123@",
    "123123#",
    "qwertyuiop1",
    "qwertyuiop12",
    "qwertyuiop123",
    "qwertyuiop1234",
    "qwertyuiop01",
    "qwertyuiop007",
    "qwertyuiop99",
    "qwertyuiop2020",
    "qwertyuiop2021",
    "qwertyuiop2022",
    "qwertyuiop2023",
    "qwertyuiop!",
    "qwertyuiop!!",
    "qwertyuiop@",
    "qwertyuiop#",
    "1q2w3e4r1",
    "1q2w3e4r12",
    "1q2w3e4r123",
    "1q2w3e4r1234",
    "1q2w3e4r01",
    "1q2w3e4r007",
    "1q2w3e4r99",
    "1q2w3e4r2020",
    "1q2w3e4r2021",
    "1q2w3e4r2022",
    "1q2w3e4r2023",
    "1q2w3e4r!",
    "1q2w3e4r!!",
    "1q2w3e4r@",
    "1q2w3e4r#",
    "passw0rd1",
    "passw0rd12",
    "passw0rd123",
    "passw0rd1234",
    "passw0rd01",
    "passw0rd007",
    "passw0rd99",
    "passw0rd2020",
    "passw0rd2021",
    "passw0rd2022",
    "passw0rd2023",
    "passw0rd!",
    "passw0rd!!",
    "passw0rd@",
    "passw0rd#",
    "trustno11",
    "trustno112",
    "trustno1123",
    "trustno11234",
    "trustno101",
    "trustno1007",
    "trustno199",
    "trustno12020",
    "trustno12021",
    "trustno12022",
    "trustno12023",
    "trustno1!",
    "trustno1!!",
    "trustno1@",
    "trustno1#",
    "baseball1",
    "baseball12",
    "baseball123",
    "baseball1234",
    "baseball01",
    "baseball007",
    "baseball99",
    "baseball2020",
    "baseball2021",
    "baseball2022",
    "baseball2023",
    "baseball!",
    "baseball!!",
    "baseball@",
    "baseball#",
    "shadow1",
    "shadow12",
    "shadow123",
    "shadow1234",
    "shadow01",
    "shadow007",
    "shadow99",
    "shadow2020",
    "shadow2021",
    "shadow2022",
    "shadow2023",
    "shadow!",
    "shadow!!",
    "shadow@",
    "shadow#",
    "superman1",
    "superman12",
    "superman123",
    "superman1234",
    "superman01",
    "superman007",
    "superman99",
    "superman2020",
    "superman2021",
    "superman2022",
    "superman2023",
    "superman!",
    "superman!!",
    "superman@",
    "superman#",
    "hello1",
    "hello12",
    "hello123",
    "hello1234",
    "hello01",
    "hello007",
    "hello99",
    "hello2020",
    "hello2021",
    "hello2022",
    "hello2023",
    "hello!",
    "hello!!",
    "hello@",
    "hello#",
    "freedom1",
    "freedom12",
    "freedom123",
    "freedom1234",
    "freedom01",
    "freedom007",
    "freedom99",
    "freedom2020",
    "freedom2021",
    "freedom2022",
    "freedom2023",
    "freedom!",
    "freedom!!",
    "freedom@",
    "freedom#",
    "whatever1",
    "whatever12",
    "whatever123",
    "whatever1234",
    "whatever01",
    "whatever007",
    "whatever99",
    "whatever2020",
    "whatever2021",
    "whatever2022",
    "whatever2023",
    "whatever!",
    "whatever!!",
    "whatever@",
    "whatever#",
    "ninja1",
    "ninja12",
    "ninja123",
    "ninja1234",
    "ninja01",
    "ninja007",
    "ninja99",
    "ninja2020",
    "ninja2021",
    "ninja2022",
    "ninja2023",
    "ninja!",
    "ninja!!",
    "ninja@",
    "ninja#",
    "mustang1",
    "mustang12",
    "mustang123",
    "mustang1234",
    "mustang01",
    "mustang007",
    "mustang99",
    "mustang2020",
    "mustang2021",
    "mustang2022",
    "mustang2023",
    "mustang!",
    "mustang!!",
    "mustang@",
    "mustang#",
    "access1",
    "access12",
    "access123",
    "access1234",
    "access01",
    "access007",
    "access99",
    "access2020",
    "access2021",
    "access2022",
    "access2023",
    "access!",
    "access!!",
    "access@",
    "access#",
    "batman1",
    "batman12",
    "batman123",
    "batman1234",
    "batman01",
    "batman007",
    "batman99",
    "batman2020",
    "batman2021",
    "batman2022",
    "batman2023",
    "batman!",
    "batman!!",
    "batman@",
    "batman#",
    "michael1",
    "michael12",
    "michael123",
    "michael1234",
    "michael01",
    "michael007",
    "michael99",
    "michael2020",
    "michael2021",
    "michael2022",
    "michael2023",
    "michael!",
    "michael!!",
    "michael@",
    "michael#",
    "jennifer1",
    "jennifer12",
    "jennifer123",
    "jennifer1234",
    "jennifer01",
    "jennifer007",
    "jennifer99",
    "jennifer2020",
    "jennifer2021",
    "jennifer2022",
    "jennifer2023",
    "jennifer!",
    "jennifer!!",
    "jennifer@",
    "jennifer#",
    "jordan1",
    "jordan12",
    "jordan123",
    "jordan1234",
    "jordan01",
    "jordan007",
    "jordan99",
    "jordan2020",
    "jordan2021",
    "jordan2022",
    "jordan2023",
    "jordan!",
    "jordan!!",
    "jordan@",
    "jordan#",
    "hunter1",
    "hunter12",
    "hunter123",
    "hunter1234",
    "hunter01",
    "hunter007",
    "hunter99",
    "hunter2020",
    "hunter2021",
    "hunter2022",
    "hunter2023",
    "hunter!",
    "hunter!!",
    "hunter@",
    "hunter#",
    "ranger1",
    "ranger12",
    "ranger123",
    "ranger1234",
    "ranger01",
    "ranger007",
    "ranger99",
    "ranger2020",
    "ranger2021",
    "ranger2022",
    "ranger2023",
    "ranger!",
    "ranger!!",
    "ranger@",
    "ranger#",
    "tigger1",
    "tigger12",
    "tigger123",
    "tigger1234",
    "tigger01",
    "tigger007",
    "tigger99",
    "tigger2020",
    "tigger2021",
    "tigger2022",
    "tigger2023",
    "tigger!",
    "tigger!!",
    "tigger@",
    "tigger#",
    "soccer1",
    "soccer12",
    "soccer123",
    "soccer1234",
    "soccer01",
    "soccer007",
    "soccer99",
    "soccer2020",
    "soccer2021",
    "soccer2022",
    "soccer2023",
    "soccer!",
    "soccer!!",
    "soccer@",
    "soccer#",
    "harley1",
    "harley12",
    "harley123",
    "harley1234",
    "harley01",
    "harley007",
    "harley99",
    "harley2020",
    "harley2021",
    "harley2022",
    "harley2023",
    "harley!",
    "harley!!",
    "harley@",
    "harley#",
    "buster1",
    "buster12",
    "buster123",
    "buster1234",
    "buster01",
    "buster007",
    "buster99",
    "buster2020",
    "buster2021",
    "buster2022",
    "buster2023",
    "buster!",
    "buster!!",
    "buster@",
    "buster#",
    "thomas1",
    "thomas12",
    "thomas123",
    "thomas1234",
    "thomas01",
    "thomas007",
    "thomas99",
    "thomas2020",
    "thomas2021",
    "thomas2022",
    "thomas2023",
    "thomas!",
    "thomas!!",
    "thomas@",
    "thomas#",
    "robert1",
    "robert12",
    "robert123",
    "robert1234",
    "robert01",
    "robert007",
    "robert99",
    "robert2020",
    "robert2021",
    "robert2022",
    "robert2023",
    "robert!",
    "robert!!",
    "robert@",
    "robert#",
    "daniel1",
    "daniel12",
    "daniel123",
    "daniel1234",
    "daniel01",
    "daniel007",
    "daniel99",
    "daniel2020",
    "daniel2021",
    "daniel2022",
    "daniel2023",
    "daniel!",
    "daniel!!",
    "daniel@",
    "daniel#",
    "george1",
    "george12",
    "george123",
    "george1234",
    "george01",
    "george007",
    "george99",
    "george2020",
    "george2021",
    "george2022",
    "george2023",
    "george!",
    "george!!",
    "george@",
    "george#",
    "computer1",
    "computer12",
    "computer123",
    "computer1234",
    "computer01",
    "computer007",
    "computer99",
    "computer2020",
    "computer2021",
    "computer2022",
    "computer2023",
    "computer!",
    "computer!!",
    "computer@",
    "computer#",
    "michelle1",
    "michelle12",
    "michelle123",
    "michelle1234",
    "michelle01",
    "michelle007",
    "michelle99",
    "michelle2020",
    "michelle2021",
    "michelle2022",
    "michelle2023",
    "michelle!",
    "michelle!!",
    "michelle@",
    "michelle#",
    "jessica1",
    "jessica12",
    "jessica123",
    "jessica1234",
    "jessica01",
    "jessica007",
    "jessica99",
    "jessica2020",
    "jessica2021",
    "jessica2022",
    "jessica2023",
    "jessica!",
    "jessica!!",
    "jessica@",
    "jessica#",
    "pepper1",
    "pepper12",
    "pepper123",
    "pepper1234",
    "pepper01",
    "pepper007",
    "pepper99",
    "pepper2020",
    "pepper2021",
    "pepper2022",
    "pepper2023",
    "pepper!",
    "pepper!!",
    "pepper@",
    "pepper#",
    "zxcvbn1",
    "zxcvbn12",
    "zxcvbn123",
    "zxcvbn1234",
    "zxcvbn01",
    "zxcvbn007",
    "zxcvbn99",
    "zxcvbn2020",
    "zxcvbn2021",
    "zxcvbn2022",
    "zxcvbn2023",
    "zxcvbn!",
    "zxcvbn!!",
    "zxcvbn@",
    "zxcvbn#",
    "asdfgh1",
    "asdfgh12",
    "asdfgh123",
    "asdfgh1234",
    "asdfgh01",
    "asdfgh007",
    "asdfgh99",
    "asdfgh2020",
    "asdfgh2021",
    "asdfgh2022",
    "asdfgh2023",
    "asdfgh!",
    "asdfgh!!",
    "asdfgh@",
    "asdfgh#",
    "qazwsx1",
    "qazwsx12",
    "qazwsx123",
    "qazwsx1234",
    "qazwsx01",
    "qazwsx007",
    "qazwsx99",
    "qazwsx2020",
    "qazwsx2021",
    "qazwsx2022",
    "qazwsx2023",
    "qazwsx!",
    "qazwsx!!",
    "qazwsx@",
    "qazwsx#",
    "taylor1",
    "taylor12",
    "taylor123",
    "taylor1234",
    "taylor01",
    "taylor007",
    "taylor99",
    "taylor2020",
    "taylor2021",
    "taylor2022",
    "taylor2023",
    "taylor!",
    "taylor!!",
    "taylor@",
    "taylor#",
    "matrix1",
    "matrix12",
    "matrix123",
    "matrix1234",
    "matrix01",
    "matrix007",
    "matrix99",
    "matrix2020",
    "matrix2021",
    "matrix2022",
    "matrix2023",
    "matrix!",
    "matrix!!",
    "matrix@",
    "matrix#",
    "tequiero1",
    "tequiero12",
    "tequiero123",
    "tequiero1234",
    "tequiero01",
    "tequiero007",
    "tequiero99",
    "tequiero2020",
    "tequiero2021",
    "tequiero2022",
    "tequiero2023",
    "tequiero!",
    "tequiero!!",
    "tequiero@",
    "tequiero#",
    "andrew1",
    "andrew12",
    "andrew123",
    "andrew1234",
    "andrew01",
    "andrew007",
    "andrew99",
    "andrew2020",
    "andrew2021",
    "andrew2022",
    "andrew2023",
    "andrew!",
    "andrew!!",
    "andrew@",
    "andrew#",
    "starwars1",
    "starwars12",
    "starwars123",
    "starwars1234",
    "starwars01",
    "starwars007",
    "starwars99",
    "starwars2020",
    "starwars2021",
    "starwars2022",
    "starwars2023",
    "starwars!",
    "starwars!!",
    "starwars@",
    "starwars#",
    "cheese1",
    "cheese12",
    "cheese123",
    "cheese1234",
    "cheese01",
    "cheese007",
    "cheese99",
    "cheese2020",
    "cheese2021",
    "cheese2022",
    "cheese2023",
    "cheese!",
    "cheese!!",
    "cheese@",
    "cheese#",
    "secret1",
    "secret12",
    "secret123",
    "secret1234",
    "secret01",
    "secret007",
    "secret99",
    "secret2020",
    "secret2021",
    "secret2022",
    "secret2023",
    "secret!",
    "secret!!",
    "secret@",
    "secret#",
    "summer1",
    "summer12",
    "summer123",
    "summer1234",
    "summer01",
    "summer007",
    "summer99",
    "summer2020",
    "summer2021",
    "summer2022",
    "summer2023",
    "summer!",
    "summer!!",
    "summer@",
    "summer#",
    "internet1",
    "internet12",
    "internet123",
    "internet1234",
    "internet01",
    "internet007",
    "internet99",
    "internet2020",
    "internet2021",
    "internet2022",
    "internet2023",
    "internet!",
    "internet!!",
    "internet@",
    "internet#",
    "service1",
    "service12",
    "service123",
    "service1234",
    "service01",
    "service007",
    "service99",
    "service2020",
    "service2021",
    "service2022",
    "service2023",
    "service!",
    "service!!",
    "service@",
    "service#",
    "canada1",
    "canada12",
    "canada123",
    "canada1234",
    "canada01",
    "canada007",
    "canada99",
    "canada2020",
    "canada2021",
    "canada2022",
    "canada2023",
    "canada!",
    "canada!!",
    "canada@",
    "canada#",
    "yankees1",
    "yankees12",
    "yankees123",
    "yankees1234",
    "yankees01",
    "yankees007",
    "yankees99",
    "yankees2020",
    "yankees2021",
    "yankees2022",
    "yankees2023",
    "yankees!",
    "yankees!!",
    "yankees@",
    "yankees#",
    "joshua1",
    "joshua12",
    "joshua123",
    "joshua1234",
    "joshua01",
    "joshua007",
    "joshua99",
    "joshua2020",
    "joshua2021",
    "joshua2022",
    "joshua2023",
    "joshua!",
    "joshua!!",
    "joshua@",
    "joshua#",
    "maggie1",
    "maggie12",
    "maggie123",
    "maggie1234",
    "maggie01",
    "maggie007",
    "maggie99",
    "maggie2020",
    "maggie2021",
    "maggie2022",
    "maggie2023",
    "maggie!",
    "maggie!!",
    "maggie@",
    "maggie#",
    "dallas1",
    "dallas12",
    "dallas123",
    "dallas1234",
    "dallas01",
    "dallas007",
    "dallas99",
    "dallas2020",
    "dallas2021",
    "dallas2022",
    "dallas2023",
    "dallas!",
    "dallas!!",
    "dallas@",
    "dallas#",
    "austin1",
    "austin12",
    "austin123",
    "austin1234",
    "austin01",
    "austin007",
    "austin99",
    "austin2020",
    "austin2021",
    "austin2022",
    "austin2023",
    "austin!",
    "austin!!",
    "austin@",
    "austin#",
    "jasper1",
    "jasper12",
    "jasper123",
    "jasper1234",
    "jasper01",
    "jasper007",
    "jasper99",
    "jasper2020",
    "jasper2021",
    "jasper2022",
    "jasper2023",
    "jasper!",
    "jasper!!",
    "jasper@",
    "jasper#",
    "orange1",
    "orange12",
];
